//! Webhook application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use tapis_hasura_auth::TokenVerifier;

use crate::config::WebhookConfig;

/// Shared application state for the webhook.
pub struct WebhookState<V>
where
    V: TokenVerifier,
{
    /// The token verifier.
    pub verifier: Arc<V>,
    /// Webhook configuration.
    pub config: WebhookConfig,
}

impl<V> WebhookState<V>
where
    V: TokenVerifier,
{
    /// Create a new webhook state.
    #[must_use]
    pub fn new(verifier: Arc<V>, config: WebhookConfig) -> Self {
        Self { verifier, config }
    }
}

impl<V> Clone for WebhookState<V>
where
    V: TokenVerifier,
{
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            config: self.config.clone(),
        }
    }
}
