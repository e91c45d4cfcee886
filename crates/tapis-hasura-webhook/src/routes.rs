//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::any::Any;
use std::sync::Arc;

use axum::error_handling::HandleErrorLayer;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{BoxError, Router};
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use tapis_hasura_auth::TokenVerifier;

use crate::error::ApiError;
use crate::handlers::{health, webhook};
use crate::state::WebhookState;

/// Create the webhook router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Liveness check
/// - `POST /auth-webhook` - Hasura POST-mode webhook
/// - `GET /auth-webhook` - Hasura GET-mode webhook
pub fn create_router<V>(state: WebhookState<V>) -> Router
where
    V: TokenVerifier + 'static,
{
    // Extract config values before moving state
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/auth-webhook",
            get(webhook::get_webhook::<V>).post(webhook::post_webhook::<V>),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Answer a timed-out request with the generic 500 body.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::error!("Request timed out");
        ApiError::Internal("request timed out".to_string())
    } else {
        tracing::error!(error = %err, "Middleware error");
        ApiError::Internal(err.to_string())
    }
}

/// Answer a panicking handler with the generic 500 body.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    tracing::error!(panic = detail, "Request handler panicked");
    ApiError::Internal(detail.to_string()).into_response()
}
