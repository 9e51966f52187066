use crate::{
    consistency::ConsistencyError,
    interface::{CodecError, StorageError},
    key::ValidationError,
    model::MappingError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Every failure the core can raise. All of them are local and
/// synchronous; nothing here is retried.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    StaleState(#[from] StaleStateError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Error {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Mapping(_) => ErrorClass::Unsupported,
            Self::Validation(_) | Self::Consistency(_) => ErrorClass::InvalidInput,
            Self::State(_) => ErrorClass::InvariantViolation,
            Self::StaleState(_) => ErrorClass::NotFound,
            Self::Storage(_) => ErrorClass::Internal,
            Self::Codec(_) => ErrorClass::Corruption,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Mapping(_) => ErrorOrigin::Model,
            Self::Validation(_) => ErrorOrigin::Key,
            Self::Consistency(_) => ErrorOrigin::Consistency,
            Self::State(err) => err.origin(),
            Self::StaleState(_) => ErrorOrigin::Context,
            Self::Storage(_) => ErrorOrigin::Executor,
            Self::Codec(_) => ErrorOrigin::Codec,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {self}", self.origin(), self.class())
    }
}

///
/// StateError
///
/// An operation was attempted in a state that does not allow it.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum StateError {
    #[error("entity '{entity}' is already managed; pass the plain entity instead of its proxy")]
    AlreadyManaged { entity: String },

    #[error("'{operation}' cannot run while a batch is open")]
    BatchPending { operation: &'static str },

    #[error("persistence context is {state}; no further operations are accepted")]
    ContextClosed { state: &'static str },

    #[error("proxy of '{actual}' cannot be used for entity '{expected}'")]
    EntityMismatch { expected: String, actual: String },

    #[error("id property '{entity}.{property}' cannot be reassigned on a managed entity")]
    IdReassign { entity: String, property: String },

    #[error("index {index} is out of bounds for list '{property}' of length {len}")]
    IndexOutOfBounds {
        property: String,
        index: usize,
        len: usize,
    },

    #[error("entity '{entity}' has no value for key column '{column}'")]
    MissingKey { entity: String, column: String },

    #[error("entity '{entity}' has no clustering key; wide-row slices need one")]
    NotClustered { entity: String },

    #[error("entity '{entity}' is not managed; a proxy is required")]
    NotManaged { entity: String },

    #[error("property '{property}' is a {actual} property; expected {expected}")]
    PropertyKind {
        property: String,
        expected: &'static str,
        actual: String,
    },

    #[error("entity rejected value for '{property}': {reason}")]
    PropertyRejected { property: String, reason: String },

    #[error("entity '{entity}' is not mapped")]
    UnknownEntity { entity: String },

    #[error("entity '{entity}' has no property '{property}'")]
    UnknownProperty { entity: String, property: String },
}

impl StateError {
    /// Proxy misuse is reported against the proxy layer, the rest against
    /// the persistence context.
    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::IdReassign { .. }
            | Self::IndexOutOfBounds { .. }
            | Self::PropertyKind { .. }
            | Self::PropertyRejected { .. }
            | Self::UnknownProperty { .. } => ErrorOrigin::Proxy,
            _ => ErrorOrigin::Context,
        }
    }
}

///
/// StaleStateError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("entity '{entity}' with key {key} no longer exists in the store")]
pub struct StaleStateError {
    pub entity: String,
    pub key: String,
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    InvalidInput,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::InvalidInput => "invalid_input",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Layer that raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Model,
    Key,
    Consistency,
    Proxy,
    Context,
    Executor,
    Codec,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Model => "model",
            Self::Key => "key",
            Self::Consistency => "consistency",
            Self::Proxy => "proxy",
            Self::Context => "context",
            Self::Executor => "executor",
            Self::Codec => "codec",
        };
        write!(f, "{label}")
    }
}
