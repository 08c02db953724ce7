//! Authentication logic.
//!
//! Provides password hashing, basic-credential parsing, and the opaque
//! session-token service backed by server-side session storage.

pub mod credentials;
pub mod password;
pub mod session;
pub mod token;

use thiserror::Error;

/// Credential authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The `Authorization` header could not be decoded. Always a client error.
    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
