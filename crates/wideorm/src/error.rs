use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use wideorm_config::ConfigError;
use wideorm_core::error::{
    Error as CoreError, ErrorClass as CoreErrorClass, ErrorOrigin as CoreErrorOrigin,
};

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
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

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        let kind = match err.class() {
            CoreErrorClass::Unsupported => ErrorKind::Mapping,
            CoreErrorClass::InvalidInput => ErrorKind::InvalidInput,
            CoreErrorClass::InvariantViolation => ErrorKind::State,
            CoreErrorClass::NotFound => ErrorKind::NotFound,
            CoreErrorClass::Internal => ErrorKind::Store,
            CoreErrorClass::Corruption => ErrorKind::Corruption,
        };

        Self::new(kind, err.origin().into(), err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Mapping declarations are invalid; bootstrap cannot proceed.
    Mapping,

    /// Keys or consistency levels supplied by the caller were rejected.
    InvalidInput,

    /// The operation is not allowed in the current context or proxy state.
    State,

    /// The entity is gone from the store.
    NotFound,

    /// The storage executor failed.
    Store,

    /// A stored value could not be decoded.
    Corruption,

    /// Configuration could not be read or parsed.
    Config,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Codec,
    Config,
    Consistency,
    Context,
    Executor,
    Key,
    Model,
    Proxy,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Model => Self::Model,
            CoreErrorOrigin::Key => Self::Key,
            CoreErrorOrigin::Consistency => Self::Consistency,
            CoreErrorOrigin::Proxy => Self::Proxy,
            CoreErrorOrigin::Context => Self::Context,
            CoreErrorOrigin::Executor => Self::Executor,
            CoreErrorOrigin::Codec => Self::Codec,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use wideorm_core::{
        error::{StaleStateError, StateError},
        model::MappingError,
    };

    #[test]
    fn core_errors_map_to_stable_kinds() {
        let err = Error::from(CoreError::from(StateError::BatchPending { operation: "slice" }));
        assert_eq!(err.kind, ErrorKind::State);
        assert_eq!(err.origin, ErrorOrigin::Context);
        assert_eq!(err.message, "'slice' cannot run while a batch is open");

        let err = Error::from(CoreError::from(StaleStateError {
            entity: "User".to_string(),
            key: "[1]".to_string(),
        }));
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = Error::from(CoreError::from(MappingError::MissingId {
            entity: "User".to_string(),
        }));
        assert_eq!((err.kind, err.origin), (ErrorKind::Mapping, ErrorOrigin::Model));
    }

    #[test]
    fn proxy_misuse_keeps_its_origin() {
        let err = Error::from(CoreError::from(StateError::IdReassign {
            entity: "User".to_string(),
            property: "id".to_string(),
        }));

        assert_eq!(err.origin, ErrorOrigin::Proxy);
    }

    #[test]
    fn errors_serialize_for_callers() {
        let err = Error::new(ErrorKind::Config, ErrorOrigin::Config, "bad level");

        let json = serde_json::to_string(&err).unwrap();

        assert_eq!(
            json,
            r#"{"kind":"Config","origin":"Config","message":"bad level"}"#
        );
        assert_eq!(serde_json::from_str::<Error>(&json).unwrap(), err);
    }
}
