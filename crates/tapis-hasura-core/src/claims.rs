//! Decoded token claims.
//!
//! Tapis has issued two incompatible claim layouts over time. A deployment picks
//! exactly one with [`ClaimSchema`]; both layouts implement [`SessionClaims`], which
//! is the only view the role resolver and the session projector have of a token.
//!
//! ```text
//! nested:  { "sub": "...", "username": "...",
//!            "tapis": { "tenant_id": "...", "account_type": "...", "roles": [...] } }
//!
//! flat:    { "sub": "...", "tapis/tenant_id": "...", "tapis/username": "...",
//!            "tapis/account_type": "...", ... }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::session::SessionVariables;

/// The claim layout produced by the deployment's token issuer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimSchema {
    /// Claims grouped under a `tapis` object, with a `roles` collection.
    #[default]
    Nested,
    /// Prefix-qualified `tapis/*` claims, no roles collection.
    Flat,
}

impl ClaimSchema {
    /// The configuration name of this schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nested => "nested",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for ClaimSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimSchema {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nested" => Ok(Self::Nested),
            "flat" => Ok(Self::Flat),
            _ => Err(CoreError::UnknownClaimSchema(s.to_string())),
        }
    }
}

/// The fields role resolution and session projection read from a token.
///
/// Implementations return `None` for absent *and* empty values so callers never
/// have to distinguish the two.
pub trait SessionClaims {
    /// The primary subject identifier (`sub`).
    fn subject(&self) -> Option<&str>;

    /// A username-like identifier used when the subject is missing.
    fn username(&self) -> Option<&str>;

    /// The Tapis account type (`admin`, `service`, `user`, ...).
    fn account_type(&self) -> Option<&str>;

    /// Whether a role membership, as opposed to the account type, grants admin.
    fn has_admin_role(&self) -> bool;

    /// Add the layout-specific optional session variables.
    fn extend_session(&self, session: &mut SessionVariables);
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Claim deserializers that drop a mistyped value instead of failing the whole
/// token. A signed token is never rejected over the shape of one claim.
mod lenient {
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Typed<T> {
        Value(T),
        Other(IgnoredAny),
    }

    impl<T> Typed<T> {
        fn into_option(self) -> Option<T> {
            match self {
                Self::Value(value) => Some(value),
                Self::Other(_) => None,
            }
        }
    }

    pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Typed::deserialize(deserializer).map(Typed::into_option)
    }

    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        optional(deserializer).map(Option::unwrap_or_default)
    }

    /// A bare string is a single role; non-string entries are skipped.
    pub fn roles<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Roles {
            Many(Vec<Typed<String>>),
            One(String),
            Other(IgnoredAny),
        }

        Ok(match Roles::deserialize(deserializer)? {
            Roles::Many(roles) => Some(
                roles
                    .into_iter()
                    .filter_map(Typed::into_option)
                    .collect(),
            ),
            Roles::One(role) => Some(vec![role]),
            Roles::Other(_) => None,
        })
    }
}

/// Tapis-specific claims of the nested layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapisClaims {
    /// Tenant the token was issued for.
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub tenant_id: Option<String>,
    /// Account type (`admin`, `service`, `user`).
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub account_type: Option<String>,
    /// Role memberships.
    #[serde(
        default,
        deserialize_with = "lenient::roles",
        skip_serializing_if = "Option::is_none"
    )]
    pub roles: Option<Vec<String>>,
}

/// Claims in the nested layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedClaims {
    /// Subject.
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,
    /// Username, used when `sub` is missing.
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    /// Tapis claims.
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub tapis: Option<TapisClaims>,
}

impl SessionClaims for NestedClaims {
    fn subject(&self) -> Option<&str> {
        non_empty(self.sub.as_deref())
    }

    fn username(&self) -> Option<&str> {
        non_empty(self.username.as_deref())
    }

    fn account_type(&self) -> Option<&str> {
        non_empty(self.tapis.as_ref()?.account_type.as_deref())
    }

    fn has_admin_role(&self) -> bool {
        self.tapis
            .as_ref()
            .and_then(|t| t.roles.as_ref())
            .is_some_and(|roles| roles.iter().any(|r| r == "admin"))
    }

    fn extend_session(&self, session: &mut SessionVariables) {
        let Some(tapis) = &self.tapis else {
            return;
        };
        if let Some(tenant_id) = non_empty(tapis.tenant_id.as_deref()) {
            session.tenant_id = Some(tenant_id.to_string());
        }
        if let Some(account_type) = non_empty(tapis.account_type.as_deref()) {
            session.account_type = Some(account_type.to_string());
        }
    }
}

/// Claims in the flat, prefix-qualified layout.
///
/// The issuer always sends the tenant, username and account type, so those are
/// plain strings (empty when a malformed token omits them).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatClaims {
    /// Subject.
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,
    /// Tenant the token was issued for.
    #[serde(rename = "tapis/tenant_id", default, deserialize_with = "lenient::or_default")]
    pub tenant_id: String,
    /// Tapis username.
    #[serde(rename = "tapis/username", default, deserialize_with = "lenient::or_default")]
    pub username: String,
    /// Account type.
    #[serde(rename = "tapis/account_type", default, deserialize_with = "lenient::or_default")]
    pub account_type: String,
    /// Token type (`access`, `refresh`).
    #[serde(
        rename = "tapis/token_type",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_type: Option<String>,
    /// Whether the token was issued through delegation.
    #[serde(
        rename = "tapis/delegation",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub delegation: Option<bool>,
    /// Delegating subject, if any.
    #[serde(
        rename = "tapis/delegation_sub",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub delegation_sub: Option<String>,
    /// OAuth client the token was issued to.
    #[serde(
        rename = "tapis/client_id",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_id: Option<String>,
    /// OAuth grant type.
    #[serde(
        rename = "tapis/grant_type",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub grant_type: Option<String>,
    /// OAuth redirect URI.
    #[serde(
        rename = "tapis/redirect_uri",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub redirect_uri: Option<String>,
    /// Number of refreshes performed on the session.
    #[serde(
        rename = "tapis/refresh_count",
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_count: Option<u32>,
    /// Token ID.
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub jti: Option<String>,
    /// Issuer.
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub iss: Option<String>,
    /// Expiry (seconds since the epoch).
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<u64>,
}

impl SessionClaims for FlatClaims {
    fn subject(&self) -> Option<&str> {
        non_empty(self.sub.as_deref())
    }

    fn username(&self) -> Option<&str> {
        non_empty(Some(&self.username))
    }

    fn account_type(&self) -> Option<&str> {
        non_empty(Some(&self.account_type))
    }

    fn has_admin_role(&self) -> bool {
        false
    }

    fn extend_session(&self, session: &mut SessionVariables) {
        session.tenant_id = Some(self.tenant_id.clone());
        session.username = Some(self.username.clone());
    }
}

/// A verified claim set in the deployment's configured layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedToken {
    /// Nested layout.
    Nested(NestedClaims),
    /// Flat layout.
    Flat(FlatClaims),
}

impl DecodedToken {
    /// The layout of these claims.
    #[must_use]
    pub const fn schema(&self) -> ClaimSchema {
        match self {
            Self::Nested(_) => ClaimSchema::Nested,
            Self::Flat(_) => ClaimSchema::Flat,
        }
    }

    fn claims(&self) -> &dyn SessionClaims {
        match self {
            Self::Nested(claims) => claims,
            Self::Flat(claims) => claims,
        }
    }
}

impl From<NestedClaims> for DecodedToken {
    fn from(claims: NestedClaims) -> Self {
        Self::Nested(claims)
    }
}

impl From<FlatClaims> for DecodedToken {
    fn from(claims: FlatClaims) -> Self {
        Self::Flat(claims)
    }
}

impl SessionClaims for DecodedToken {
    fn subject(&self) -> Option<&str> {
        self.claims().subject()
    }

    fn username(&self) -> Option<&str> {
        self.claims().username()
    }

    fn account_type(&self) -> Option<&str> {
        self.claims().account_type()
    }

    fn has_admin_role(&self) -> bool {
        self.claims().has_admin_role()
    }

    fn extend_session(&self, session: &mut SessionVariables) {
        self.claims().extend_session(session);
    }
}
