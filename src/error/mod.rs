//! Error definitions
//!
//! This module provides error types for testkit-doubles.
//!
//! Failures produced by a wrapped coroutine, by a delegate installed with
//! `calls`, or configured with `throws` are never converted into this type:
//! they reach the caller unchanged as the coroutine's own error type.

use thiserror::Error;

/// Main error type for testkit-doubles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The spy or stub target could not be resolved to a coroutine.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Generic failure produced by a stub configured with `throws_default`.
    #[error("Stub forced failure")]
    ForcedFailure,

    /// The owner has no member with the given name.
    #[error("Missing member: {0}")]
    MissingMember(String),
}

impl Error {
    /// Create an invalid target error.
    #[must_use]
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget(message.into())
    }

    /// Create a missing member error.
    #[must_use]
    pub fn missing_member(name: impl Into<String>) -> Self {
        Self::MissingMember(name.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::invalid_target("no coroutine").to_string(),
            "Invalid target: no coroutine"
        );
        assert_eq!(Error::ForcedFailure.to_string(), "Stub forced failure");
        assert_eq!(
            Error::missing_member("gen").to_string(),
            "Missing member: gen"
        );
    }
}
