//! Signing-key fetching and caching.
//!
//! Tapis publishes a tenant's token signing key through its tenants API:
//!
//! ```text
//! GET /v3/tenants/<tenant>
//! { "result": { "public_key": "-----BEGIN PUBLIC KEY-----...", ... }, "status": "success", ... }
//! ```
//!
//! A standard JWK Set (`{ "keys": [...] }`) is accepted from the same URL as well.
//! Keys are cached for the configured max age, and refetches are limited to a
//! per-minute budget so a stream of bad tokens cannot hammer the tenant service.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Window the fetch budget applies to.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Response body from the signing-key endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeySetResponse {
    /// A standard JWK Set.
    Jwks(JwkSet),
    /// The Tapis tenant envelope.
    Tenant(TenantResponse),
}

/// Tapis tenants API response.
#[derive(Debug, Deserialize)]
pub struct TenantResponse {
    /// The tenant record.
    pub result: TenantResult,
    /// Response status (`success`).
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// The part of a tenant record the webhook needs.
#[derive(Debug, Deserialize)]
pub struct TenantResult {
    /// PEM-encoded RSA public key used to sign the tenant's tokens.
    #[serde(default)]
    pub public_key: Option<String>,
}

/// Keys from the last successful fetch.
#[derive(Default)]
struct CachedKeys {
    by_kid: HashMap<String, DecodingKey>,
    /// A key published without a `kid`. Serves any token.
    default: Option<DecodingKey>,
    fetched_at: Option<Instant>,
}

impl CachedKeys {
    fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < max_age)
    }

    /// A token naming a `kid` only matches that `kid` or an unkeyed key. A token
    /// without one may also use the only keyed key in the set.
    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        let keyed = match kid {
            Some(kid) => self.by_kid.get(kid),
            None if self.by_kid.len() == 1 => self.by_kid.values().next(),
            None => None,
        };
        keyed.or(self.default.as_ref()).cloned()
    }

    fn len(&self) -> usize {
        self.by_kid.len() + usize::from(self.default.is_some())
    }
}

/// Signing-key provider that fetches and caches the issuer's public keys.
pub struct SigningKeyProvider {
    key_url: String,
    max_age: Duration,
    requests_per_minute: u32,
    client: reqwest::Client,
    cache: RwLock<CachedKeys>,
    recent_fetches: Mutex<VecDeque<Instant>>,
}

impl SigningKeyProvider {
    /// Create a new key provider with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.key_fetch_timeout())
            .build()
            .expect("failed to create HTTP client");

        Self {
            key_url: config.key_url.clone(),
            max_age: config.key_cache_max_age(),
            requests_per_minute: config.key_requests_per_minute,
            client,
            cache: RwLock::new(CachedKeys::default()),
            recent_fetches: Mutex::new(VecDeque::new()),
        }
    }

    /// The endpoint keys are fetched from.
    #[must_use]
    pub fn key_url(&self) -> &str {
        &self.key_url
    }

    /// Get the decoding key for a token's `kid`, fetching if necessary.
    ///
    /// A cached key set that does not contain `kid` is refetched once, so a key
    /// rotation on the issuer side is picked up before the cache expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found, the fetch budget is spent, or the
    /// fetch fails.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        {
            let cache = self.cache.read();
            if cache.is_fresh(self.max_age) {
                if let Some(key) = cache.lookup(kid) {
                    return Ok(key);
                }
            }
        }

        self.refresh_keys().await?;

        self.cache
            .read()
            .lookup(kid)
            .ok_or_else(|| AuthError::KeyNotFound(kid.unwrap_or("<none>").to_string()))
    }

    /// Refresh the key cache by fetching from the signing-key endpoint.
    async fn refresh_keys(&self) -> Result<()> {
        self.take_fetch_slot()?;

        tracing::debug!(url = %self.key_url, "Fetching signing keys");

        let response = self
            .client
            .get(&self.key_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::KeyFetchFailed(format!(
                "HTTP {status} from signing-key endpoint"
            )));
        }

        let body: KeySetResponse = response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetchFailed(e.to_string()))?;

        let keys = Self::parse_keys(body)?;
        tracing::debug!(count = keys.len(), "Cached signing keys");

        *self.cache.write() = keys;
        Ok(())
    }

    /// Record a fetch against the per-minute budget, or refuse it.
    fn take_fetch_slot(&self) -> Result<()> {
        if self.requests_per_minute == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut fetches = self.recent_fetches.lock();
        while fetches
            .front()
            .is_some_and(|at| now.duration_since(*at) >= RATE_LIMIT_WINDOW)
        {
            fetches.pop_front();
        }

        if fetches.len() >= self.requests_per_minute as usize {
            tracing::warn!(
                limit = self.requests_per_minute,
                "Signing key fetch budget exhausted"
            );
            return Err(AuthError::KeyRateLimited);
        }

        fetches.push_back(now);
        Ok(())
    }

    /// Turn an endpoint response into a key cache.
    fn parse_keys(body: KeySetResponse) -> Result<CachedKeys> {
        let mut keys = CachedKeys {
            fetched_at: Some(Instant::now()),
            ..CachedKeys::default()
        };

        match body {
            KeySetResponse::Tenant(tenant) => {
                let pem = tenant
                    .result
                    .public_key
                    .filter(|pem| !pem.trim().is_empty())
                    .ok_or_else(|| {
                        AuthError::KeyFetchFailed("no public key found in response".to_string())
                    })?;

                let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AuthError::KeyFetchFailed(format!("invalid public key: {e}")))?;
                keys.default = Some(key);
            }
            KeySetResponse::Jwks(set) => {
                for jwk in &set.keys {
                    if matches!(
                        jwk.common.public_key_use,
                        Some(PublicKeyUse::Encryption | PublicKeyUse::Other(_))
                    ) {
                        continue;
                    }
                    if !matches!(jwk.algorithm, AlgorithmParameters::RSA(_)) {
                        tracing::debug!(kid = ?jwk.common.key_id, "Skipping non-RSA key");
                        continue;
                    }

                    let key = match DecodingKey::from_jwk(jwk) {
                        Ok(key) => key,
                        Err(e) => {
                            tracing::warn!(kid = ?jwk.common.key_id, error = %e, "Unusable JWK");
                            continue;
                        }
                    };

                    match &jwk.common.key_id {
                        Some(kid) => {
                            keys.by_kid.insert(kid.clone(), key);
                        }
                        None if keys.default.is_none() => keys.default = Some(key),
                        None => {}
                    }
                }
            }
        }

        if keys.by_kid.is_empty() && keys.default.is_none() {
            return Err(AuthError::KeyFetchFailed(
                "no usable signing keys in response".to_string(),
            ));
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tapis_hasura_core::ClaimSchema;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::testing::{config, jwks_body, serve_keys, tenant_body, JWKS_PATH, TENANT_PATH};

    fn parse(body: serde_json::Value) -> Result<CachedKeys> {
        SigningKeyProvider::parse_keys(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn parse_tenant_public_key() {
        let keys = parse(tenant_body()).unwrap();
        assert!(keys.default.is_some());
        assert!(keys.by_kid.is_empty());
        assert!(keys.lookup(Some("anything")).is_some());
    }

    #[test]
    fn parse_tenant_without_public_key() {
        let result = parse(json!({ "result": { "tenant_id": "tacc" }, "status": "success" }));
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
    }

    #[test]
    fn parse_tenant_with_garbage_key() {
        let result = parse(json!({ "result": { "public_key": "not a pem" } }));
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
    }

    #[test]
    fn parse_jwks_indexes_by_kid() {
        let keys = parse(jwks_body("tacc-1")).unwrap();
        assert!(keys.by_kid.contains_key("tacc-1"));
        assert!(keys.default.is_none());
        // A single published key also serves tokens without a kid...
        assert!(keys.lookup(None).is_some());
        // ...but never a token naming a different kid.
        assert!(keys.lookup(Some("tacc-2")).is_none());
    }

    #[test]
    fn parse_jwks_unkeyed_key_is_default() {
        let mut body = jwks_body("unused");
        body["keys"][0].as_object_mut().unwrap().remove("kid");
        let keys = parse(body).unwrap();
        assert!(keys.by_kid.is_empty());
        assert!(keys.lookup(Some("anything")).is_some());
    }

    #[test]
    fn parse_jwks_skips_encryption_keys() {
        let mut body = jwks_body("enc-1");
        body["keys"][0]["use"] = json!("enc");
        let result = parse(body);
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
    }

    #[tokio::test]
    async fn fetches_once_and_caches() {
        let server = MockServer::start().await;
        serve_keys(&server, TENANT_PATH, tenant_body(), 1).await;
        let provider = SigningKeyProvider::new(&config(&server, TENANT_PATH, ClaimSchema::Nested));

        assert!(provider.get_key(None).await.is_ok());
        assert!(provider.get_key(Some("rotated")).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_kid_refetches_then_fails() {
        let server = MockServer::start().await;
        let mut body = jwks_body("tacc-1");
        body["keys"]
            .as_array_mut()
            .unwrap()
            .push(jwks_body("tacc-2")["keys"][0].clone());
        serve_keys(&server, JWKS_PATH, body, 2).await;
        let provider = SigningKeyProvider::new(&config(&server, JWKS_PATH, ClaimSchema::Nested));

        assert!(provider.get_key(Some("tacc-1")).await.is_ok());
        let result = provider.get_key(Some("tacc-9")).await;
        assert_eq!(result.err(), Some(AuthError::KeyNotFound("tacc-9".to_string())));
    }

    #[tokio::test]
    async fn rotated_single_key_set_is_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body("old-kid")))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        serve_keys(&server, JWKS_PATH, jwks_body("rotated-kid"), 1).await;
        let provider = SigningKeyProvider::new(&config(&server, JWKS_PATH, ClaimSchema::Nested));

        assert!(provider.get_key(Some("old-kid")).await.is_ok());
        assert!(provider.get_key(Some("rotated-kid")).await.is_ok());
        // The old key is gone after the rotation refetch.
        assert!(provider.cache.read().lookup(Some("old-kid")).is_none());
    }

    #[tokio::test]
    async fn unknown_kid_in_single_key_set_refetches() {
        let server = MockServer::start().await;
        serve_keys(&server, JWKS_PATH, jwks_body("old-kid"), 2).await;
        let provider = SigningKeyProvider::new(&config(&server, JWKS_PATH, ClaimSchema::Nested));

        assert!(provider.get_key(Some("old-kid")).await.is_ok());
        let result = provider.get_key(Some("rotated-kid")).await;
        assert_eq!(
            result.err(),
            Some(AuthError::KeyNotFound("rotated-kid".to_string()))
        );
    }

    #[tokio::test]
    async fn expired_cache_refetches() {
        let server = MockServer::start().await;
        serve_keys(&server, TENANT_PATH, tenant_body(), 2).await;
        let mut auth_config = config(&server, TENANT_PATH, ClaimSchema::Nested);
        auth_config.key_cache_max_age_seconds = 0;
        let provider = SigningKeyProvider::new(&auth_config);

        assert!(provider.get_key(None).await.is_ok());
        assert!(provider.get_key(None).await.is_ok());
    }

    #[tokio::test]
    async fn fetch_budget_is_enforced() {
        let server = MockServer::start().await;
        serve_keys(&server, TENANT_PATH, tenant_body(), 1).await;
        let mut auth_config = config(&server, TENANT_PATH, ClaimSchema::Nested);
        auth_config.key_cache_max_age_seconds = 0;
        auth_config.key_requests_per_minute = 1;
        let provider = SigningKeyProvider::new(&auth_config);

        assert!(provider.get_key(None).await.is_ok());
        assert_eq!(
            provider.get_key(None).await.err(),
            Some(AuthError::KeyRateLimited)
        );
    }

    #[tokio::test]
    async fn http_error_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TENANT_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let provider = SigningKeyProvider::new(&config(&server, TENANT_PATH, ClaimSchema::Nested));

        let result = provider.get_key(None).await;
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
    }

    #[tokio::test]
    async fn non_json_body_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TENANT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;
        let provider = SigningKeyProvider::new(&config(&server, TENANT_PATH, ClaimSchema::Nested));

        let result = provider.get_key(None).await;
        assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
    }
}
