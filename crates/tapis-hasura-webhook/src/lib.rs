//! Hasura authentication webhook backed by Tapis tokens.
//!
//! Hasura forwards every GraphQL request's headers to this webhook, which
//! answers with the session variables Hasura uses for its permission rules:
//!
//! - No `Authorization` header: `{ "X-Hasura-Role": "anonymous" }`
//! - A token that fails verification: 401 `{ "message": "Invalid token" }`
//! - A verified token: role, user ID and tenant claims as `X-Hasura-*` variables
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  headers   ┌──────────────────────┐
//! │     Hasura      │───────────▶│ tapis-hasura-webhook │
//! └─────────────────┘            │  router + handlers   │
//!                                └──────────┬───────────┘
//!                        ┌──────────────────┼──────────────────┐
//!                        ▼                                     ▼
//!             ┌────────────────────┐              ┌────────────────────┐
//!             │ tapis-hasura-auth  │              │ tapis-hasura-core  │
//!             │ token verification │              │ roles + session    │
//!             └─────────┬──────────┘              └────────────────────┘
//!                       │ HTTPS
//!                       ▼
//!             ┌────────────────────┐
//!             │ Tapis tenant keys  │
//!             └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapis_hasura_auth::TapisVerifier;
//! use tapis_hasura_webhook::{create_router, WebhookConfig, WebhookServer, WebhookState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WebhookConfig::from_env()?;
//! let verifier = Arc::new(TapisVerifier::new(config.auth.clone()));
//! let listen_addr = config.listen_addr.clone();
//!
//! let app = create_router(WebhookState::new(verifier, config));
//!
//! WebhookServer::bind(&listen_addr, app)
//!     .await?
//!     .serve_with_shutdown(tapis_hasura_webhook::server::shutdown_signal())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ConfigError, WebhookConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use server::WebhookServer;
pub use state::WebhookState;
