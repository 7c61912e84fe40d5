//! Deliver individual log records to a mailbox through the Gmail API.
//!
//! The host logging framework formats each event into a string and hands it
//! to [`GmailAppender::append`]. The appender composes an RFC 5322 message,
//! queues it, and a worker thread submits it to the Gmail
//! `users.messages.send` endpoint, authenticated as a service account
//! impersonating the configured mailbox (domain-wide delegation, scoped to
//! `gmail.send` only).
//!
//! Delivery is fail-soft: a problem composing or sending a message is
//! reported through the `log` facade and that one record is dropped.
//! `append` never panics or returns an error into the host's pipeline.
//!
//! ```no_run
//! use gmail_appender::GmailAppender;
//!
//! let appender = GmailAppender::builder()
//!     .service_account_key("/etc/svc/ops-logger.json")
//!     .delegate("ops@example.com")
//!     .recipients("oncall@example.com, sre@example.com")
//!     .subject("Production alert")
//!     .build()
//!     .into_appender();
//!
//! appender.append("disk full on db-3");
//! ```

pub mod appender;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gmail;
pub mod message;

pub use appender::{BuildResult, Builder, GmailAppender};
pub use config::AppenderConfig;
pub use dispatch::{DispatchConfig, OverflowPolicy};
pub use error::Error;
pub use gmail::{
    Credential, CredentialError, GmailClient, Transport, TransportConfig, TransportError,
};
pub use message::{ComposedMessage, MessageError};
