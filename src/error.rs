//! Error type surfaced to the host

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

use crate::{
    config::{store::StoreError, ConfigError},
    dispatch::MailError,
    message::ValidationError,
};

/// Error returned by the host facing operations
///
/// Its `Display` is the text the host shows to the user.
#[derive(Debug)]
pub enum Error {
    /// The stored configuration can not be used
    Config(ConfigError),
    /// The message can not be sent as is
    Validation(ValidationError),
    /// The server or the network failed during the send
    Mail(MailError),
    /// The configuration store failed
    Store(StoreError),
}

impl Error {
    /// The dispatch error, if the failure happened during the send
    pub fn as_mail(&self) -> Option<&MailError> {
        match self {
            Error::Mail(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(err) => Display::fmt(err, f),
            Error::Validation(err) => Display::fmt(err, f),
            // Details stay available through `source`
            Error::Mail(err) => Display::fmt(&err.kind(), f),
            Error::Store(err) => write!(f, "unable to access configuration: {err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Validation(err) => Some(err),
            Error::Mail(err) => Some(err),
            Error::Store(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Error {
        Error::Validation(err)
    }
}

impl From<MailError> for Error {
    fn from(err: MailError) -> Error {
        Error::Mail(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Error {
        Error::Store(err)
    }
}
