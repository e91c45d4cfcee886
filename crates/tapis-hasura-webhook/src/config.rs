//! Webhook configuration.
//!
//! Configuration comes from environment variables, read once at startup.
//! Unset or empty variables fall back to their defaults; malformed values fail
//! startup instead of being silently ignored.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use tapis_hasura_auth::AuthConfig;
use tapis_hasura_core::{ClaimSchema, CoreError};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// The claim schema name is unknown.
    #[error(transparent)]
    ClaimSchema(#[from] CoreError),

    /// A key fetch could outlive the request waiting on it.
    #[error(
        "REQUEST_TIMEOUT_SECONDS ({request}) must exceed JWKS_FETCH_TIMEOUT_SECONDS ({key_fetch})"
    )]
    TimeoutOrder {
        /// Request timeout in seconds.
        request: u64,
        /// Key fetch timeout in seconds.
        key_fetch: u64,
    },
}

/// Configuration for the webhook service.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Listen address (e.g., "0.0.0.0:3000").
    pub listen_addr: String,

    /// Deployment environment (`development`, `production`, ...).
    pub environment: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Token verification settings.
    pub auth: AuthConfig,
}

impl WebhookConfig {
    const DEFAULT_PORT: u16 = 3000;

    fn default_environment() -> String {
        "development".to_string()
    }

    const fn default_max_body() -> usize {
        64 * 1024
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value, or if the
    /// request timeout does not exceed the key fetch timeout.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let port = parse(&get, "PORT")?.unwrap_or(Self::DEFAULT_PORT);
        let listen_addr = get("LISTEN_ADDR").unwrap_or_else(|| format!("0.0.0.0:{port}"));

        let defaults = AuthConfig::default();
        let claim_schema = get("TAPIS_CLAIM_SCHEMA")
            .map(|value| ClaimSchema::from_str(&value))
            .transpose()?
            .unwrap_or(defaults.claim_schema);
        let key_cache_max_age_seconds = parse::<u64, _>(&get, "JWKS_CACHE_MAX_AGE")?
            .map_or(defaults.key_cache_max_age_seconds, |millis| millis / 1000);

        let auth = AuthConfig {
            key_url: get("TAPIS_JWKS_URI").unwrap_or(defaults.key_url),
            issuer: get("TAPIS_TOKEN_ISSUER").unwrap_or(defaults.issuer),
            claim_schema,
            key_cache_max_age_seconds,
            key_requests_per_minute: parse(&get, "JWKS_REQUESTS_PER_MINUTE")?
                .unwrap_or(defaults.key_requests_per_minute),
            key_fetch_timeout_seconds: parse(&get, "JWKS_FETCH_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.key_fetch_timeout_seconds),
        };

        let request_timeout_seconds = parse(&get, "REQUEST_TIMEOUT_SECONDS")?
            .unwrap_or(Self::default_request_timeout());
        // A hung key service must surface as a failed fetch, not a request timeout.
        if request_timeout_seconds <= auth.key_fetch_timeout_seconds {
            return Err(ConfigError::TimeoutOrder {
                request: request_timeout_seconds,
                key_fetch: auth.key_fetch_timeout_seconds,
            });
        }

        Ok(Self {
            listen_addr,
            environment: get("ENVIRONMENT").unwrap_or_else(Self::default_environment),
            max_body_bytes: parse(&get, "MAX_BODY_BYTES")?.unwrap_or(Self::default_max_body()),
            request_timeout_seconds,
            auth,
        })
    }

    /// Whether this is a development deployment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn parse<T, F>(get: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var, value })
        })
        .transpose()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", Self::DEFAULT_PORT),
            environment: Self::default_environment(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            auth: AuthConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WebhookConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        WebhookConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn default_config() {
        let config = WebhookConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.max_body_bytes, 64 * 1024);
        assert!(config.is_development());
        assert_eq!(config.auth, AuthConfig::default());
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.environment, "development");
        assert_eq!(config.auth, AuthConfig::default());
    }

    #[test]
    fn reads_tapis_settings() {
        let config = load(&[
            ("PORT", "8081"),
            ("TAPIS_JWKS_URI", "https://tacc.tapis.io/v3/tenants/tacc"),
            ("TAPIS_TOKEN_ISSUER", "https://tacc.tapis.io/v3/tokens"),
            ("TAPIS_CLAIM_SCHEMA", "flat"),
            ("JWKS_CACHE_MAX_AGE", "3600000"),
            ("JWKS_REQUESTS_PER_MINUTE", "10"),
            ("ENVIRONMENT", "production"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8081");
        assert_eq!(config.auth.key_url, "https://tacc.tapis.io/v3/tenants/tacc");
        assert_eq!(config.auth.issuer, "https://tacc.tapis.io/v3/tokens");
        assert_eq!(config.auth.claim_schema, ClaimSchema::Flat);
        assert_eq!(config.auth.key_cache_max_age_seconds, 3600);
        assert_eq!(config.auth.key_requests_per_minute, 10);
        assert!(!config.is_development());
    }

    #[test]
    fn listen_addr_overrides_port() {
        let config = load(&[("PORT", "8081"), ("LISTEN_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn blank_values_are_unset() {
        let config = load(&[("PORT", "  "), ("TAPIS_CLAIM_SCHEMA", "")]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.auth.claim_schema, ClaimSchema::Nested);
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = load(&[("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "PORT", .. }));

        let err = load(&[("JWKS_REQUESTS_PER_MINUTE", "-1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "JWKS_REQUESTS_PER_MINUTE",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_schema() {
        let err = load(&[("TAPIS_CLAIM_SCHEMA", "v2")]).unwrap_err();
        assert!(matches!(err, ConfigError::ClaimSchema(_)));
    }

    #[test]
    fn request_timeout_must_exceed_key_fetch_timeout() {
        let config = load(&[
            ("JWKS_FETCH_TIMEOUT_SECONDS", "5"),
            ("REQUEST_TIMEOUT_SECONDS", "6"),
        ])
        .unwrap();
        assert_eq!(config.auth.key_fetch_timeout_seconds, 5);

        let err = load(&[("REQUEST_TIMEOUT_SECONDS", "10")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TimeoutOrder {
                request: 10,
                key_fetch: 10
            }
        ));
    }

    #[test]
    fn default_timeouts_are_ordered() {
        let config = WebhookConfig::default();
        assert!(config.request_timeout() > config.auth.key_fetch_timeout());
    }

    #[test]
    fn timeout_duration() {
        let config = WebhookConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
