//! Hasura session variables.
//!
//! The webhook answers Hasura with a flat JSON object whose keys are the session
//! variable header names. Optional variables are left out of the object entirely
//! rather than sent as `null` or `""`.

use serde::{Deserialize, Serialize};

use crate::claims::SessionClaims;
use crate::role::{resolve_role, Role};

/// How long Hasura may cache a session, in seconds.
pub const SESSION_CACHE_MAX_AGE_SECS: u32 = 600;

/// User ID sent when a token carries neither a subject nor a username.
const ANONYMOUS_USER_ID: &str = "anonymous";

/// Session variables returned to Hasura.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionVariables {
    /// `X-Hasura-Role`.
    #[serde(rename = "X-Hasura-Role")]
    pub role: Role,

    /// `X-Hasura-User-Id`.
    #[serde(
        rename = "X-Hasura-User-Id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,

    /// `X-Hasura-Tenant-Id`.
    #[serde(
        rename = "X-Hasura-Tenant-Id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tenant_id: Option<String>,

    /// `X-Hasura-Account-Type`.
    #[serde(
        rename = "X-Hasura-Account-Type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub account_type: Option<String>,

    /// `X-Hasura-Username`.
    #[serde(
        rename = "X-Hasura-Username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,

    /// `Cache-Control`, read by Hasura to cache the webhook response.
    #[serde(
        rename = "Cache-Control",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_control: Option<String>,
}

impl SessionVariables {
    /// The session for a request that presented no token: the role and nothing else.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            role: Role::Anonymous,
            user_id: None,
            tenant_id: None,
            account_type: None,
            username: None,
            cache_control: None,
        }
    }

    /// Project verified claims into session variables.
    ///
    /// The user ID is the subject, else the username, else `anonymous`. Which
    /// optional variables appear depends on the claim layout.
    #[must_use]
    pub fn from_claims<C: SessionClaims + ?Sized>(claims: &C) -> Self {
        let user_id = claims
            .subject()
            .or_else(|| claims.username())
            .unwrap_or(ANONYMOUS_USER_ID);

        let mut session = Self {
            role: resolve_role(claims),
            user_id: Some(user_id.to_string()),
            tenant_id: None,
            account_type: None,
            username: None,
            cache_control: Some(Self::cache_directive()),
        };
        claims.extend_session(&mut session);
        session
    }

    /// The `Cache-Control` value attached to every token-derived session.
    #[must_use]
    pub fn cache_directive() -> String {
        format!("max-age={SESSION_CACHE_MAX_AGE_SECS}")
    }
}
