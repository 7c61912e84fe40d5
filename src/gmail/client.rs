//! The one remote call this crate makes per log record.

use std::error;
use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use url::Url;

use super::auth::Credential;
use super::{http_client, TransportConfig, GMAIL_BASE_API};
use crate::message::ComposedMessage;

/// Error type for delivery attempts. Reported, never retried internally.
#[derive(Clone, Debug)]
pub enum TransportError {
    /// The bearer credential was rejected or has expired.
    AuthExpired(String),
    /// The request never completed (connect failure, timeout).
    NetworkUnavailable(String),
    /// The service answered with an application-level error
    /// (invalid recipient, quota exceeded, ...).
    RemoteRejected(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransportError::AuthExpired(ref msg) => write!(f, "AuthExpired: {}", msg),
            TransportError::NetworkUnavailable(ref msg) => {
                write!(f, "NetworkUnavailable: {}", msg)
            }
            TransportError::RemoteRejected(ref msg) => write!(f, "RemoteRejected: {}", msg),
        }
    }
}

impl error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NetworkUnavailable("request timeout".into())
        } else {
            Self::NetworkUnavailable(err.to_string())
        }
    }
}

/// Anything that can hand a composed message to a delivery service.
///
/// One call means one delivery attempt; whether a failure is fatal or
/// swallowed is the caller's decision.
pub trait Transport: Send + Sync {
    fn submit(&self, sender: &str, message: &ComposedMessage) -> Result<(), TransportError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    raw: &'a str,
}

/// Gmail `users.messages.send` client. Owns the delegated credential for
/// its whole lifetime; the credential is never handed out.
pub struct GmailClient {
    credential: Credential,
    client: reqwest::blocking::Client,
}

impl GmailClient {
    pub fn new(credential: Credential, config: &TransportConfig) -> Result<Self, TransportError> {
        let client = http_client(config)?;
        Ok(Self { credential, client })
    }
}

impl Transport for GmailClient {
    fn submit(&self, sender: &str, message: &ComposedMessage) -> Result<(), TransportError> {
        let raw = message.encode_raw();

        let resp = self
            .client
            .post(send_url(sender)?)
            .bearer_auth(self.credential.bearer_token())
            .json(&SendRequest { raw: &raw })
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let msg = resp.text().unwrap_or_default();
            return Err(classify_status(status, &msg));
        }

        Ok(())
    }
}

fn send_url(sender: &str) -> Result<Url, TransportError> {
    Url::parse(GMAIL_BASE_API)
        .and_then(|base| base.join(&format!("users/{}/messages/send", sender)))
        .map_err(|e| TransportError::RemoteRejected(e.to_string()))
}

/// Map a Gmail API response status to the transport error taxonomy
fn classify_status(status: StatusCode, msg: &str) -> TransportError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TransportError::AuthExpired(format!("{}: {}", status, msg))
        }
        _ => TransportError::RemoteRejected(format!("{}: {}", status, msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_send_endpoint_for_sender() {
        let url = send_url("ops@x.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://gmail.googleapis.com/gmail/v1/users/ops@x.com/messages/send"
        );
    }

    #[test]
    fn rejected_credential_maps_to_auth_expired() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "invalid_grant"),
            TransportError::AuthExpired(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "access denied"),
            TransportError::AuthExpired(_)
        ));
    }

    #[test]
    fn service_errors_map_to_remote_rejected() {
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "invalid recipient"),
            TransportError::RemoteRejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "quota exceeded"),
            TransportError::RemoteRejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            TransportError::RemoteRejected(_)
        ));
    }

    #[test]
    fn send_request_serializes_raw_field() {
        let json = serde_json::to_string(&SendRequest { raw: "AAAA" }).unwrap();
        assert_eq!(json, r#"{"raw":"AAAA"}"#);
    }
}
