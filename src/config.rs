use std::path::PathBuf;

use crate::error::Error;

/// Immutable appender configuration. Held by the appender for its entire
/// lifetime; rebuilt only when the appender itself is rebuilt.
///
/// Loading and merging of configuration files is the host's concern. This
/// type only enforces the construction invariants on the values it is
/// handed.
#[derive(Clone, Debug)]
pub struct AppenderConfig {
    /// Path to the service account key file (JSON, as downloaded from the
    /// Google Cloud console).
    pub service_account_key: PathBuf,
    /// Mailbox to impersonate and send as.
    pub delegate: String,
    /// Comma-delimited recipient address list.
    pub recipients: String,
    /// Subject line used for every delivered record.
    pub subject: String,
    /// MIME type of the body. Absent means plain text.
    pub content_type: Option<String>,
}

impl AppenderConfig {
    /// Every required field must be present and non-empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.service_account_key.as_os_str().is_empty() {
            return Err(Error::Config("No serviceAccountKey provided".into()));
        }
        if self.delegate.is_empty() {
            return Err(Error::Config("No delegate provided".into()));
        }
        if self.recipients.is_empty() {
            return Err(Error::Config("No recipients provided".into()));
        }
        if self.subject.is_empty() {
            return Err(Error::Config("No subject provided".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppenderConfig {
        AppenderConfig {
            service_account_key: "/etc/svc/key.json".into(),
            delegate: "ops@x.com".into(),
            recipients: "a@x.com".into(),
            subject: "Alert".into(),
            content_type: None,
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn content_type_is_optional() {
        let mut config = valid();
        config.content_type = Some("text/html".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_missing_fields() {
        let mut config = valid();
        config.service_account_key = PathBuf::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.delegate = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.recipients = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.subject = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
