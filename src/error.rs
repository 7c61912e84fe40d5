use std::error;
use std::fmt;

use crate::gmail::{CredentialError, TransportError};
use crate::message::MessageError;

/// All possible appender errors
#[derive(Clone, Debug)]
pub enum Error {
    /// A required configuration field is missing or empty.
    Config(String),
    /// The delegated credential could not be acquired (build time only).
    Credential(CredentialError),
    /// A message could not be composed from the configured inputs.
    Message(MessageError),
    /// The Gmail API call failed.
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Config(ref msg) => write!(f, "Config: {}", msg),
            Error::Credential(ref e) => write!(f, "Credential: {}", e),
            Error::Message(ref e) => write!(f, "Message: {}", e),
            Error::Transport(ref e) => write!(f, "Transport: {}", e),
        }
    }
}

impl error::Error for Error {}

impl From<CredentialError> for Error {
    fn from(err: CredentialError) -> Self {
        Error::Credential(err)
    }
}

impl From<MessageError> for Error {
    fn from(err: MessageError) -> Self {
        Error::Message(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err)
    }
}
