#![forbid(unsafe_code)]

//! The engine error type.
//!
//! Every fallible operation in the workspace returns [`ReactiveError`].
//! Callback errors are carried through the same type so a failure hook can
//! tell them apart with [`ReactiveError::is_callback_failure`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Why a path segment could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathFailure {
    #[error("is missing")]
    Missing,

    #[error("is reached through a {found}, not an object")]
    NotAnObject { found: &'static str },
}

#[derive(Debug, Error)]
pub enum ReactiveError {
    #[error("invalid path `{path}`: {reason}")]
    PathSyntax { path: String, reason: String },

    #[error("cannot resolve `{path}`: segment `{segment}` {failure}")]
    InvalidPath {
        path: String,
        segment: String,
        failure: PathFailure,
    },

    #[error("unknown name: {name}")]
    UnknownName { name: String },

    #[error("expected {expected} for `{name}`, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("index {index} is out of bounds for array of length {len}")]
    IndexOutOfBounds { index: String, len: usize },

    #[error("field `{key}` is read-only")]
    ReadOnly { key: String },

    #[error("assigning to `{key}` would make an object contain itself")]
    CyclicAssignment { key: String },

    #[error("root data must be an object, found {found}")]
    DataNotObject { found: &'static str },

    #[error("callback failed: {message}")]
    Callback { message: String },

    #[error("callback panicked: {message}")]
    CallbackPanicked { message: String },

    #[error("consumer `{label}` was re-notified more than {limit} times in one update")]
    ReentrancyLimit { label: String, limit: u32 },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl ReactiveError {
    #[must_use]
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_path(
        path: impl Into<String>,
        segment: impl Into<String>,
        failure: PathFailure,
    ) -> Self {
        Self::InvalidPath {
            path: path.into(),
            segment: segment.into(),
            failure,
        }
    }

    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownName { name: name.into() }
    }

    /// Whether the error came out of a consumer callback rather than the engine.
    #[must_use]
    pub fn is_callback_failure(&self) -> bool {
        matches!(self, Self::Callback { .. } | Self::CallbackPanicked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_path_message_names_segment() {
        let err = ReactiveError::invalid_path("a.b.c", "b", PathFailure::Missing);
        assert_eq!(
            err.to_string(),
            "cannot resolve `a.b.c`: segment `b` is missing"
        );

        let err = ReactiveError::invalid_path(
            "a.b",
            "b",
            PathFailure::NotAnObject { found: "number" },
        );
        assert!(err.to_string().contains("through a number"));
    }

    #[test]
    fn callback_classification() {
        assert!(ReactiveError::callback("boom").is_callback_failure());
        assert!(
            ReactiveError::CallbackPanicked {
                message: "boom".into()
            }
            .is_callback_failure()
        );
        assert!(!ReactiveError::unknown("x").is_callback_failure());
    }

    #[test]
    fn cyclic_assignment_names_key() {
        let err = ReactiveError::CyclicAssignment { key: "me".into() };
        assert_eq!(
            err.to_string(),
            "assigning to `me` would make an object contain itself"
        );
        assert!(!err.is_callback_failure());
    }
}
