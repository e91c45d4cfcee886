//! Tapis Hasura Webhook - authentication webhook for Hasura
//!
//! This is the main entry point for the webhook service.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a mock token verifier that doesn't
//! require network access to Tapis.
//! Use tokens in format: `test-token:<subject>[:<account_type>]`

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "dev-mode")]
use tapis_hasura_auth::MockTokenVerifier;
#[cfg(not(feature = "dev-mode"))]
use tapis_hasura_auth::TapisVerifier;
use tapis_hasura_webhook::server::shutdown_signal;
use tapis_hasura_webhook::{create_router, WebhookConfig, WebhookServer, WebhookState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = WebhookConfig::from_env()?;

    // Initialize tracing
    let default_filter = if config.is_development() {
        "info,tapis_hasura=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tapis Hasura webhook");
    tracing::info!(
        listen_addr = %config.listen_addr,
        environment = %config.environment,
        key_url = %config.auth.key_url,
        issuer = %config.auth.issuer,
        claim_schema = %config.auth.claim_schema,
        "Webhook configuration loaded"
    );

    // Initialize token verifier
    #[cfg(feature = "dev-mode")]
    let verifier = {
        tracing::warn!("DEV MODE ENABLED - using mock token verifier");
        tracing::warn!("Use tokens in format: test-token:<subject>[:<account_type>]");
        Arc::new(MockTokenVerifier::new(config.auth.claim_schema))
    };

    #[cfg(not(feature = "dev-mode"))]
    let verifier = Arc::new(TapisVerifier::new(config.auth.clone()));
    tracing::info!("Token verifier initialized");

    let listen_addr = config.listen_addr.clone();
    let app = create_router(WebhookState::new(verifier, config));

    // Start HTTP server
    let server = WebhookServer::bind(&listen_addr, app).await?;
    tracing::info!(addr = %server.local_addr()?, "Tapis auth webhook listening");
    server.serve_with_shutdown(shutdown_signal()).await?;

    tracing::info!("Webhook stopped");
    Ok(())
}
