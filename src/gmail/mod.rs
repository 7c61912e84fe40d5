//! Gmail API plumbing: delegated credential acquisition and the send call.

use std::time::Duration;

pub mod auth;
pub mod client;

pub use auth::{authorize, Credential, CredentialError};
pub use client::{GmailClient, Transport, TransportError};

pub(crate) const GMAIL_BASE_API: &str = "https://gmail.googleapis.com/gmail/v1/";
pub(crate) const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
pub(crate) const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// Request timeout, in seconds
const GMAIL_REQUEST_TIMEOUT: u64 = 30;

/// Explicit transport tuning for every HTTPS call this crate makes.
///
/// Process-wide TLS negotiation settings are deliberately not touched;
/// the floor is configured here, once, and handed to each client builder.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Minimum acceptable TLS version.
    pub min_tls_version: reqwest::tls::Version,
    /// Per-request timeout covering connect and the full round-trip.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            min_tls_version: reqwest::tls::Version::TLS_1_2,
            timeout: Duration::from_secs(GMAIL_REQUEST_TIMEOUT),
        }
    }
}

pub(crate) fn http_client(
    config: &TransportConfig,
) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .min_tls_version(config.min_tls_version)
        .timeout(config.timeout)
        .build()
}
