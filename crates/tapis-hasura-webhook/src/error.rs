//! API error types and responses.
//!
//! Hasura only needs to know whether a request is unauthenticated or whether the
//! webhook itself failed, so every error collapses to one of two generic bodies.
//! Fault details go to the log, never to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use tapis_hasura_auth::AuthError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The presented token could not be verified.
    #[error("unauthorized")]
    Unauthorized,

    /// Unexpected fault while handling the request.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: &'static str,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the message sent to the caller.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Invalid token",
            Self::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            message: self.public_message(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_verification_failure() {
            tracing::warn!(error = %err, "Token verification failed");
            Self::Unauthorized
        } else {
            tracing::error!(error = %err, "Token verification fault");
            Self::Internal(err.to_string())
        }
    }
}
