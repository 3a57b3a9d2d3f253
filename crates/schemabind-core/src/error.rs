use crate::{generator::GenerationError, loader::LoadError};
use schemabind_schema::error::SchemaError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// BindingError
///
/// Structured runtime error with a stable classification.
/// `class` says what went wrong, `origin` says which component noticed.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct BindingError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail from an external collaborator.
    pub detail: Option<ErrorDetail>,
}

impl BindingError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Schema metadata was not installed before the configured wait elapsed.
    pub(crate) fn not_ready(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotReady, origin, message)
    }

    /// A reference could not be mapped to a loaded type.
    pub(crate) fn unresolved(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unresolved, origin, message)
    }

    /// No case accepted the wire evidence.
    pub(crate) fn ambiguous(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Ambiguous, ErrorOrigin::Choice, message)
    }

    /// Operation invoked on an entry or type of the wrong kind.
    pub(crate) fn misuse(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Misuse, origin, message)
    }

    /// Wire data has the wrong shape for the codec handling it.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidInput, ErrorOrigin::Codec, message)
    }

    /// Internal bookkeeping disagrees with itself.
    pub(crate) fn invariant(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, origin, message)
    }

    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self.class, ErrorClass::Misuse)
    }

    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self.class, ErrorClass::Ambiguous)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<SchemaError> for BindingError {
    fn from(err: SchemaError) -> Self {
        Self {
            class: ErrorClass::Schema,
            origin: ErrorOrigin::Schema,
            message: err.to_string(),
            detail: Some(ErrorDetail::Schema(err)),
        }
    }
}

impl From<GenerationError> for BindingError {
    fn from(err: GenerationError) -> Self {
        Self {
            class: ErrorClass::Generation,
            origin: ErrorOrigin::Generator,
            message: err.to_string(),
            detail: Some(ErrorDetail::Generation(err)),
        }
    }
}

impl From<LoadError> for BindingError {
    fn from(err: LoadError) -> Self {
        Self {
            class: ErrorClass::Unresolved,
            origin: ErrorOrigin::Loader,
            message: err.to_string(),
            detail: Some(ErrorDetail::Load(err)),
        }
    }
}

///
/// ErrorDetail
///
/// The collaborator error a [`BindingError`] was converted from.
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Generation(GenerationError),

    #[error("{0}")]
    Load(LoadError),

    #[error("{0}")]
    Schema(SchemaError),
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    NotReady,
    Unresolved,
    Generation,
    Ambiguous,
    Misuse,
    InvalidInput,
    Schema,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotReady => "not_ready",
            Self::Unresolved => "unresolved",
            Self::Generation => "generation",
            Self::Ambiguous => "ambiguous",
            Self::Misuse => "misuse",
            Self::InvalidInput => "invalid_input",
            Self::Schema => "schema",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Augmentation,
    Choice,
    Codec,
    Generator,
    Identity,
    Loader,
    Registry,
    Schema,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Augmentation => "augmentation",
            Self::Choice => "choice",
            Self::Codec => "codec",
            Self::Generator => "generator",
            Self::Identity => "identity",
            Self::Loader => "loader",
            Self::Registry => "registry",
            Self::Schema => "schema",
        };
        write!(f, "{label}")
    }
}
