//! Hasura roles and role resolution.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claims::SessionClaims;

/// The access level forwarded to Hasura as `X-Hasura-Role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Tapis administrators.
    Admin,
    /// Service accounts.
    Service,
    /// Any other authenticated caller.
    User,
    /// No token was presented at all. Never derived from a token.
    Anonymous,
}

impl Role {
    /// The role name sent to Hasura.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Service => "service",
            Self::User => "user",
            Self::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify verified claims into a role.
///
/// First match wins:
///
/// 1. account type `admin`, or an `admin` role membership → [`Role::Admin`]
/// 2. account type `service` → [`Role::Service`]
/// 3. anything else, including a missing account type → [`Role::User`]
///
/// Only the nested claim layout carries role memberships; for the flat layout
/// rule 1 reduces to the account type check.
#[must_use]
pub fn resolve_role<C: SessionClaims + ?Sized>(claims: &C) -> Role {
    let account_type = claims.account_type();

    if account_type == Some("admin") || claims.has_admin_role() {
        return Role::Admin;
    }
    if account_type == Some("service") {
        return Role::Service;
    }
    Role::User
}
