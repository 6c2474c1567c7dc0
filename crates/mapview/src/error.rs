use derive_more::Display;
use mapview_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match (err.class, err.origin) {
            (ErrorClass::Config, _) | (ErrorClass::InvariantViolation, CoreErrorOrigin::Config) => {
                ErrorKind::Config
            }
            (ErrorClass::Unsupported, _) => ErrorKind::Unsupported,
            (ErrorClass::InvariantViolation, CoreErrorOrigin::Key) => ErrorKind::InvalidKey,
            (ErrorClass::InvariantViolation, CoreErrorOrigin::View) => ErrorKind::InvalidView,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

///
/// ErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Config,
    InvalidKey,
    InvalidView,
    Unsupported,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Key,
    View,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Key => Self::Key,
            CoreErrorOrigin::View => Self::View,
        }
    }
}
