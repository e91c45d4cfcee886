//! Tapis token verification for the Hasura webhook.
//!
//! This crate turns a bearer token into a [`DecodedToken`]:
//!
//! - Signing-key fetching from the Tapis tenant endpoint, with caching and a
//!   refetch budget
//! - RS256 signature, expiry and issuer validation
//! - Decoding into the deployment's configured claim layout
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Webhook        │────▶│  TokenVerifier   │
//! │   (HTTP)         │     │  (trait)         │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  TapisVerifier   │
//!                          │  (impl)          │
//!                          └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │SigningKeyProvider│
//!                          │  (key cache)     │
//!                          └────────┬─────────┘
//!                                   │ HTTPS
//!                          ┌────────▼─────────┐
//!                          │  Tapis tenant    │
//!                          │  endpoint        │
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tapis_hasura_auth::{AuthConfig, TapisVerifier, TokenVerifier};
//! use tapis_hasura_core::SessionVariables;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = TapisVerifier::new(AuthConfig::default());
//!
//! // In a request handler:
//! let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9...";
//! let claims = verifier.verify(token).await?;
//! let session = SessionVariables::from_claims(&claims);
//!
//! println!("Role: {}", session.role);
//! # Ok(())
//! # }
//! ```
//!
//! [`DecodedToken`]: tapis_hasura_core::DecodedToken

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::time::Duration;

use tapis_hasura_core::ClaimSchema;

pub mod error;
pub mod jwt;
pub mod keys;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AuthError, Result};
pub use jwt::{TapisVerifier, TokenVerifier};
pub use keys::SigningKeyProvider;

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockTokenVerifier;

/// Configuration for verifying Tapis tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Signing-key endpoint (a Tapis tenant URL or a JWKS URL).
    pub key_url: String,
    /// Required `iss` claim.
    pub issuer: String,
    /// Claim layout produced by the issuer.
    pub claim_schema: ClaimSchema,
    /// How long fetched signing keys are trusted, in seconds.
    pub key_cache_max_age_seconds: u64,
    /// Maximum signing-key fetches per minute. Zero disables the limit.
    pub key_requests_per_minute: u32,
    /// Timeout for a single signing-key fetch, in seconds.
    pub key_fetch_timeout_seconds: u64,
}

impl AuthConfig {
    /// Get the key cache lifetime as a `Duration`.
    #[must_use]
    pub const fn key_cache_max_age(&self) -> Duration {
        Duration::from_secs(self.key_cache_max_age_seconds)
    }

    /// Get the key fetch timeout as a `Duration`.
    #[must_use]
    pub const fn key_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.key_fetch_timeout_seconds)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key_url: "https://portals.tapis.io/v3/tenants/portals".to_string(),
            issuer: "https://portals.tapis.io/v3/tokens".to_string(),
            claim_schema: ClaimSchema::Nested,
            key_cache_max_age_seconds: 86_400, // 24 hours
            key_requests_per_minute: 5,
            key_fetch_timeout_seconds: 10,
        }
    }
}
