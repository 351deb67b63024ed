//! Error types for the session core and the learning data backend.

use thiserror::Error;

/// Failures inside the session core.
///
/// None of these cross the public session contract: the manager converts
/// them into a `false` return or an unauthenticated state.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token string is not well-formed, or its signature does not match.
    #[error("malformed token: {0}")]
    Decode(String),

    /// The persisted tokens decode but none is still within its lifetime.
    #[error("session expired: {0}")]
    Expired(String),

    /// A decoded identity did not resolve to a known user.
    #[error("no user matches {0}")]
    LookupMiss(String),

    #[error("email {0} is already registered")]
    DuplicateEmail(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("failed to issue token: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for AuthError {
    fn from(err: base64::DecodeError) -> Self {
        AuthError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Decode(err.to_string())
    }
}

/// Failures from the learning data backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("learning {0} not found")]
    LearningNotFound(String),

    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(i64),
}
