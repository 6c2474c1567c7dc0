use crate::{cache::KeyError, config::ConfigError, view::ViewError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    #[must_use]
    pub const fn is_view_defect(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::View(_)))
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Config(ConfigError),

    #[error("{0}")]
    Key(KeyError),

    #[error("{0}")]
    View(ViewError),
}

impl From<KeyError> for InternalError {
    fn from(err: KeyError) -> Self {
        Self {
            class: ErrorClass::InvariantViolation,
            origin: ErrorOrigin::Key,
            message: err.to_string(),
            detail: Some(ErrorDetail::Key(err)),
        }
    }
}

impl From<ViewError> for InternalError {
    fn from(err: ViewError) -> Self {
        let class = match err {
            ViewError::UnresolvedModel { .. } => ErrorClass::Unsupported,
            _ => ErrorClass::InvariantViolation,
        };

        Self {
            class,
            origin: ErrorOrigin::View,
            message: err.to_string(),
            detail: Some(ErrorDetail::View(err)),
        }
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self {
            class: ErrorClass::Config,
            origin: ErrorOrigin::Config,
            message: err.to_string(),
            detail: Some(ErrorDetail::Config(err)),
        }
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Config,
    InvariantViolation,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::InvariantViolation => "invariant_violation",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Config,
    Key,
    View,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Key => "key",
            Self::View => "view",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
