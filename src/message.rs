use std::error;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use mailparse::{addrparse, MailAddr};

const CRLF: &str = "\r\n";

/// Error type for message composition
#[derive(Clone, Debug)]
pub enum MessageError {
    /// The recipient list is empty or contains an unparseable address.
    AddressInvalid(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MessageError::AddressInvalid(ref msg) => write!(f, "AddressInvalid: {}", msg),
        }
    }
}

impl error::Error for MessageError {}

/// A fully-encoded RFC 5322 message, ready for transmission.
///
/// Built once per log event and discarded after the delivery attempt. The
/// transport forwards the bytes opaquely; nothing downstream rewrites them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedMessage {
    raw: Vec<u8>,
}

impl ComposedMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The base64url (unpadded) rendering the Gmail API expects in the
    /// `raw` field of a send request.
    pub fn encode_raw(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.raw)
    }
}

/// Parse a comma-delimited header-style address list into bare addresses.
///
/// Every token must be a valid address; an empty or invalid list is an
/// error, never a partially-addressed result.
pub fn parse_recipients(recipients: &str) -> Result<Vec<String>, MessageError> {
    let parsed =
        addrparse(recipients).map_err(|e| MessageError::AddressInvalid(e.to_string()))?;

    let mut addrs = Vec::new();
    for addr in parsed.iter() {
        match addr {
            MailAddr::Single(info) => addrs.push(info.addr.clone()),
            MailAddr::Group(group) => {
                for info in &group.addrs {
                    addrs.push(info.addr.clone());
                }
            }
        }
    }

    if addrs.is_empty() {
        return Err(MessageError::AddressInvalid("no recipients".into()));
    }

    // addrparse accepts a few token shapes we do not (e.g. a bare word)
    for addr in &addrs {
        if !addr.contains('@') {
            return Err(MessageError::AddressInvalid(addr.clone()));
        }
    }

    Ok(addrs)
}

/// Compose a transmission-ready message for one log record.
///
/// Without a content type the body becomes a single `text/plain` part. With
/// one, the body becomes a `multipart/alternative` carrying exactly one
/// part of the declared type, payload verbatim; the caller is responsible
/// for content already valid for that type (e.g. pre-escaped HTML).
///
/// Output is deterministic for identical inputs, except for the Date
/// header.
pub fn compose(
    recipients: &str,
    subject: &str,
    body: &str,
    content_type: Option<&str>,
) -> Result<ComposedMessage, MessageError> {
    let to = parse_recipients(recipients)?.join(", ");

    let mut msg = String::new();
    msg.push_str(&format!("To: {}{}", to, CRLF));
    msg.push_str(&format!("Subject: {}{}", subject, CRLF));
    msg.push_str(&format!("Date: {}{}", Utc::now().to_rfc2822(), CRLF));
    msg.push_str(&format!("MIME-Version: 1.0{}", CRLF));

    match content_type {
        None => {
            msg.push_str(&format!("Content-Type: text/plain; charset=utf-8{}", CRLF));
            msg.push_str(CRLF);
            msg.push_str(body);
        }
        Some(ctype) => {
            let boundary = boundary_for(body);
            msg.push_str(&format!(
                "Content-Type: multipart/alternative; boundary=\"{}\"{}",
                boundary, CRLF
            ));
            msg.push_str(CRLF);
            msg.push_str(&format!("--{}{}", boundary, CRLF));
            msg.push_str(&format!("Content-Type: {}{}", ctype, CRLF));
            msg.push_str(CRLF);
            msg.push_str(body);
            msg.push_str(CRLF);
            msg.push_str(&format!("--{}--{}", boundary, CRLF));
        }
    }

    Ok(ComposedMessage {
        raw: msg.into_bytes(),
    })
}

/// Deterministic part delimiter: a fixed marker, extended until it no
/// longer collides with body content.
fn boundary_for(body: &str) -> String {
    let mut boundary = String::from("=_log_record_part");
    while body.contains(&boundary) {
        boundary.push('_');
    }
    boundary
}
