//! JWT validation and claims decoding.
//!
//! This module provides the core verification logic: signature, expiry and
//! issuer checks, then decoding into the deployment's claim layout.

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use tapis_hasura_core::{ClaimSchema, DecodedToken, FlatClaims, NestedClaims};

use crate::error::{AuthError, Result};
use crate::keys::SigningKeyProvider;
use crate::AuthConfig;

/// Trait for verifying bearer tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token and decode its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be verified.
    async fn verify(&self, token: &str) -> Result<DecodedToken>;
}

/// Verifier for tokens signed by a Tapis tenant.
///
/// Tokens must be RS256-signed by a key published at the configured key URL,
/// unexpired, and issued by the configured issuer. The audience is not checked;
/// Tapis does not set one.
pub struct TapisVerifier {
    config: AuthConfig,
    keys: SigningKeyProvider,
}

impl TapisVerifier {
    /// Create a new Tapis verifier.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let keys = SigningKeyProvider::new(&config);
        Self { config, keys }
    }

    /// Get a reference to the signing-key provider.
    #[must_use]
    pub const fn keys(&self) -> &SigningKeyProvider {
        &self.keys
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        // A token without an expiry is refused outright.
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_aud = false;
        validation
    }
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::InvalidToken(err.to_string()),
    }
}

#[async_trait]
impl TokenVerifier for TapisVerifier {
    async fn verify(&self, token: &str) -> Result<DecodedToken> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let key = self.keys.get_key(header.kid.as_deref()).await?;
        let validation = self.validation();

        let claims = match self.config.claim_schema {
            ClaimSchema::Nested => decode::<NestedClaims>(token, &key, &validation)
                .map(|data| DecodedToken::Nested(data.claims)),
            ClaimSchema::Flat => decode::<FlatClaims>(token, &key, &validation)
                .map(|data| DecodedToken::Flat(data.claims)),
        }
        .map_err(|e| map_jwt_error(&e))?;

        Ok(claims)
    }
}

/// A mock token verifier for tests and local development.
///
/// Registered tokens resolve to their registered claims or error. Any other token
/// of the form `test-token:<subject>[:<account_type>]` decodes into the configured
/// claim layout; everything else is rejected as malformed.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockTokenVerifier {
    schema: ClaimSchema,
    tokens: std::collections::HashMap<String, Result<DecodedToken>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockTokenVerifier {
    /// Create a mock verifier decoding test tokens into `schema`.
    #[must_use]
    pub fn new(schema: ClaimSchema) -> Self {
        Self {
            schema,
            tokens: std::collections::HashMap::new(),
        }
    }

    /// Accept `token` and decode it to `claims`.
    #[must_use]
    pub fn with_claims(mut self, token: impl Into<String>, claims: impl Into<DecodedToken>) -> Self {
        self.tokens.insert(token.into(), Ok(claims.into()));
        self
    }

    /// Fail verification of `token` with `error`.
    #[must_use]
    pub fn with_error(mut self, token: impl Into<String>, error: AuthError) -> Self {
        self.tokens.insert(token.into(), Err(error));
        self
    }

    fn parse_test_token(&self, token: &str) -> Result<DecodedToken> {
        let rest = token.strip_prefix("test-token:").ok_or_else(|| {
            AuthError::InvalidToken("expected test-token:<subject>[:<account_type>]".to_string())
        })?;

        let (subject, account_type) = match rest.split_once(':') {
            Some((subject, account_type)) => (subject, Some(account_type)),
            None => (rest, None),
        };
        if subject.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(match self.schema {
            ClaimSchema::Nested => DecodedToken::Nested(NestedClaims {
                sub: Some(subject.to_string()),
                username: None,
                tapis: account_type.map(|account_type| tapis_hasura_core::TapisClaims {
                    account_type: Some(account_type.to_string()),
                    ..tapis_hasura_core::TapisClaims::default()
                }),
            }),
            ClaimSchema::Flat => DecodedToken::Flat(FlatClaims {
                sub: Some(subject.to_string()),
                username: subject.to_string(),
                account_type: account_type.unwrap_or("user").to_string(),
                ..FlatClaims::default()
            }),
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockTokenVerifier {
    fn default() -> Self {
        Self::new(ClaimSchema::Nested)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<DecodedToken> {
        match self.tokens.get(token) {
            Some(registered) => registered.clone(),
            None => self.parse_test_token(token),
        }
    }
}
