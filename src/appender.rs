//! The appender façade: one entry point per log event, and the fail-soft
//! boundary around everything underneath it.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppenderConfig;
use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::error::Error;
use crate::gmail::{self, GmailClient, Transport, TransportConfig};
use crate::message;

/// Outcome of building a [`GmailAppender`].
///
/// A failed build is an explicit variant, not a null: the host decides
/// whether to discard the instance or keep an inert one around.
pub enum BuildResult {
    Ready(GmailAppender),
    Failed(Error),
}

impl BuildResult {
    /// The ready appender, if the build succeeded.
    pub fn ok(self) -> Option<GmailAppender> {
        match self {
            BuildResult::Ready(appender) => Some(appender),
            BuildResult::Failed(_) => None,
        }
    }

    /// The build error, if there was one.
    pub fn error(&self) -> Option<&Error> {
        match self {
            BuildResult::Ready(_) => None,
            BuildResult::Failed(e) => Some(e),
        }
    }

    /// An appender in either case. A failed build yields a permanently
    /// inert instance: every record handed to it is a no-op.
    pub fn into_appender(self) -> GmailAppender {
        match self {
            BuildResult::Ready(appender) => appender,
            BuildResult::Failed(_) => GmailAppender { inner: None },
        }
    }
}

struct Inner {
    config: AppenderConfig,
    dispatcher: Dispatcher,
}

/// Delivers formatted log records to a mailbox through the Gmail API.
///
/// The instance is either ready (credential acquired at build time) or
/// permanently inert (build failed). Either way, [`GmailAppender::append`]
/// never surfaces a fault to the caller.
pub struct GmailAppender {
    inner: Option<Inner>,
}

impl GmailAppender {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Whether this instance will deliver anything at all.
    pub fn is_ready(&self) -> bool {
        self.inner.is_some()
    }

    /// Hand one fully formatted log record over for delivery.
    ///
    /// This is the fail-soft boundary: composition failures, a full queue,
    /// and delivery failures are reported through the `log` facade and the
    /// record is dropped. The host's logging pipeline is never interrupted.
    pub fn append(&self, text: &str) {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => return,
        };

        let composed = match message::compose(
            &inner.config.recipients,
            &inner.config.subject,
            text,
            inner.config.content_type.as_deref(),
        ) {
            Ok(composed) => composed,
            Err(e) => {
                log::error!("dropping log record, message composition failed: {}", e);
                return;
            }
        };

        if !inner.dispatcher.dispatch(composed) {
            log::warn!("dropping log record, delivery queue is full");
        }
    }

    /// Wait until every queued record has been handed to the transport.
    pub fn flush(&self) {
        if let Some(inner) = &self.inner {
            inner.dispatcher.flush();
        }
    }
}

/// Collects the appender configuration; everything is validated in
/// [`Builder::build`].
#[derive(Default)]
pub struct Builder {
    service_account_key: Option<PathBuf>,
    delegate: Option<String>,
    recipients: Option<String>,
    subject: Option<String>,
    content_type: Option<String>,
    transport: TransportConfig,
    dispatch: DispatchConfig,
}

impl Builder {
    /// Path to the service account key file.
    pub fn service_account_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.service_account_key = Some(path.into());
        self
    }

    /// Mailbox to impersonate and send as.
    pub fn delegate(mut self, delegate: impl Into<String>) -> Self {
        self.delegate = Some(delegate.into());
        self
    }

    /// Comma-delimited recipient address list.
    pub fn recipients(mut self, recipients: impl Into<String>) -> Self {
        self.recipients = Some(recipients.into());
        self
    }

    /// Subject line used for every delivered record.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// MIME type of the body. Leave unset for plain text.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn transport(mut self, config: TransportConfig) -> Self {
        self.transport = config;
        self
    }

    pub fn dispatch(mut self, config: DispatchConfig) -> Self {
        self.dispatch = config;
        self
    }

    /// Validate the configuration and acquire the delegated credential.
    ///
    /// Build failures are terminal for the instance: the error is reported
    /// once through the `log` facade and carried in the result; nothing is
    /// thrown past this boundary.
    pub fn build(self) -> BuildResult {
        match self.try_build() {
            Ok(appender) => BuildResult::Ready(appender),
            Err(e) => {
                log::error!("gmail appender disabled, build failed: {}", e);
                BuildResult::Failed(e)
            }
        }
    }

    fn try_build(self) -> Result<GmailAppender, Error> {
        let config = AppenderConfig {
            service_account_key: self.service_account_key.unwrap_or_default(),
            delegate: self.delegate.unwrap_or_default(),
            recipients: self.recipients.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            content_type: self.content_type,
        };
        config.validate()?;

        // A bad recipient list should disable the appender here, not
        // surface on the first event.
        message::parse_recipients(&config.recipients)?;

        let credential = gmail::authorize(
            &config.service_account_key,
            &config.delegate,
            &self.transport,
        )?;
        let client = GmailClient::new(credential, &self.transport)?;

        Ok(assemble(config, Arc::new(client), self.dispatch))
    }
}

fn assemble(
    config: AppenderConfig,
    transport: Arc<dyn Transport>,
    dispatch: DispatchConfig,
) -> GmailAppender {
    // Sends are issued as the delegate, matching the credential's scope
    let dispatcher = Dispatcher::spawn(transport, config.delegate.clone(), dispatch);
    GmailAppender {
        inner: Some(Inner { config, dispatcher }),
    }
}
