//! Crate-wide error type.
//!
//! Structural errors (graph rewiring, state declaration, spring construction)
//! are returned synchronously from the failing call. Evaluation failures
//! discovered while propagating a change travel on an observable's error
//! channel instead, which is why [`Error`] is `Clone`.

use crate::style::parser::ParseError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the reactive, style and layout core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A graph or registry contract was violated by the caller.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A spring breakpoint table is malformed.
    #[error("invalid constraint: {message}")]
    InvalidConstraint { message: String },

    /// An expression could not produce a value.
    #[error("evaluation failed: {message}")]
    EvaluationFailure { message: String },

    /// Internal wiring bug: never a recoverable runtime condition.
    #[error("internal consistency violated: {message}")]
    InternalConsistency { message: String },

    /// The animation driver thread could not be started.
    #[error("animation driver: {message}")]
    Driver { message: String },

    /// A textual state expression could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_constraint(message: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            message: message.into(),
        }
    }

    pub(crate) fn evaluation(message: impl Into<String>) -> Self {
        Self::EvaluationFailure {
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::InternalConsistency {
            message: message.into(),
        }
    }

    pub(crate) fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Whether this error signals a wiring bug rather than a user error.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalConsistency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = Error::invalid_argument("node 3 is not a dependent");
        assert_eq!(err.to_string(), "invalid argument: node 3 is not a dependent");
    }

    #[test]
    fn internal_flag() {
        assert!(Error::internal("cache miss").is_internal());
        assert!(!Error::evaluation("division by zero").is_internal());
    }

    #[test]
    fn parse_error_converts() {
        let err: Error = ParseError::UnexpectedEof("expected state name".into()).into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("expected state name"));
    }
}
