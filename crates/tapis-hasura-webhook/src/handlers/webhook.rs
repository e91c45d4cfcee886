//! Hasura authentication webhook endpoints.
//!
//! Hasura calls the webhook in one of two modes:
//!
//! - **POST**: the client's headers arrive in the JSON body,
//!   `{ "headers": { "Authorization": "Bearer ..." }, "request": { ... } }`
//! - **GET**: the client's headers are forwarded as request headers
//!
//! Both modes resolve the same way: no token gives the anonymous role, a token that
//! fails verification gives 401, and a verified token gives its session variables.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use axum::Json;
use serde::Deserialize;

use tapis_hasura_auth::{AuthError, TokenVerifier};
use tapis_hasura_core::SessionVariables;

use crate::error::ApiError;
use crate::state::WebhookState;

/// Body of a POST-mode webhook call.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    /// The client request's headers.
    pub headers: HashMap<String, String>,
}

/// Find the `Authorization` header in a forwarded header map, ignoring case.
#[must_use]
pub fn authorization_header(headers: &HashMap<String, String>) -> Option<&str> {
    headers
        .get("Authorization")
        .or_else(|| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

/// Extract the token from an `Authorization` value.
///
/// Returns `None` when there is no credential at all. A value without the `Bearer`
/// scheme is passed through whole and left for the verifier to reject.
#[must_use]
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let value = authorization.trim();
    if value.is_empty() {
        return None;
    }

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => Some(token.trim()),
        _ => Some(value),
    }
}

/// Resolve the session for an optional `Authorization` value.
async fn authenticate<V>(verifier: &V, authorization: Option<&str>) -> Result<SessionVariables, ApiError>
where
    V: TokenVerifier + ?Sized,
{
    let Some(token) = authorization.and_then(bearer_token) else {
        tracing::debug!("No bearer token, resolving anonymous session");
        return Ok(SessionVariables::anonymous());
    };

    match verifier.verify(token).await {
        Ok(claims) => {
            let session = SessionVariables::from_claims(&claims);
            tracing::debug!(
                role = %session.role,
                user_id = ?session.user_id,
                schema = %claims.schema(),
                "Resolved session"
            );
            Ok(session)
        }
        Err(err) => Err(ApiError::from(err)),
    }
}

/// POST-mode webhook handler.
///
/// A body that is not a JSON object with a `headers` map of strings is an
/// unexpected fault, not an authentication failure.
///
/// # Errors
///
/// Returns 401 when the token fails verification and 500 on any other fault.
pub async fn post_webhook<V>(
    State(state): State<Arc<WebhookState<V>>>,
    body: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<SessionVariables>, ApiError>
where
    V: TokenVerifier + 'static,
{
    let Json(request) = body.map_err(|rejection| {
        tracing::error!(error = %rejection, "Malformed webhook request");
        ApiError::Internal(rejection.body_text())
    })?;

    authenticate(state.verifier.as_ref(), authorization_header(&request.headers))
        .await
        .map(Json)
}

/// GET-mode webhook handler.
///
/// An `Authorization` header that is not visible ASCII is a presented credential
/// that cannot be a valid token, so it is rejected rather than read as absent.
///
/// # Errors
///
/// Returns 401 when the token fails verification and 500 on any other fault.
pub async fn get_webhook<V>(
    State(state): State<Arc<WebhookState<V>>>,
    headers: HeaderMap,
) -> Result<Json<SessionVariables>, ApiError>
where
    V: TokenVerifier + 'static,
{
    let authorization = headers
        .get(AUTHORIZATION)
        .map(HeaderValue::to_str)
        .transpose()
        .map_err(|e| {
            ApiError::from(AuthError::InvalidToken(format!(
                "unreadable Authorization header: {e}"
            )))
        })?;

    authenticate(state.verifier.as_ref(), authorization)
        .await
        .map(Json)
}
