//! Common error types for the webhook.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while interpreting deployment settings for the core types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The configured claim schema name is not one of `nested` or `flat`.
    #[error("unknown claim schema: {0} (expected `nested` or `flat`)")]
    UnknownClaimSchema(String),
}
