//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while verifying a token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The JWT has expired.
    #[error("token expired")]
    TokenExpired,

    /// The JWT signature is invalid.
    #[error("invalid signature")]
    InvalidSignature,

    /// The JWT issuer does not match the expected value.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The token format or claims are invalid.
    #[error("invalid token format: {0}")]
    InvalidToken(String),

    /// Failed to fetch signing keys from the signing-key service.
    #[error("signing key fetch failed: {0}")]
    KeyFetchFailed(String),

    /// The key ID specified in the token was not found.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The signing-key refetch budget for the current minute is spent.
    #[error("signing key fetch rate limited")]
    KeyRateLimited,

    /// An unexpected fault unrelated to the token itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if the token could not be verified, as opposed to an
    /// unexpected internal fault.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::TokenExpired
            | Self::InvalidSignature
            | Self::InvalidIssuer
            | Self::InvalidToken(_)
            | Self::KeyFetchFailed(_)
            | Self::KeyNotFound(_)
            | Self::KeyRateLimited => 401,
            Self::Internal(_) => 500,
        }
    }
}
