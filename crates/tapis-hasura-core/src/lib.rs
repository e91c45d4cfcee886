//! Core types for the Tapis → Hasura authentication webhook.
//!
//! This crate holds the only real decision logic of the webhook:
//!
//! - **Claims**: the two claim shapes Tapis has issued over time, behind one
//!   [`SessionClaims`] adapter trait
//! - **Roles**: classifying a decoded token into a Hasura [`Role`]
//! - **Session variables**: projecting claims into the flat header map Hasura consumes
//!
//! Everything here is synchronous and total: no function in this crate fails on a
//! decoded token.
//!
//! # Example
//!
//! ```
//! use tapis_hasura_core::{NestedClaims, Role, SessionVariables, TapisClaims};
//!
//! let claims = NestedClaims {
//!     sub: Some("user123".to_string()),
//!     tapis: Some(TapisClaims {
//!         account_type: Some("service".to_string()),
//!         ..TapisClaims::default()
//!     }),
//!     ..NestedClaims::default()
//! };
//!
//! let session = SessionVariables::from_claims(&claims);
//! assert_eq!(session.role, Role::Service);
//! assert_eq!(session.user_id.as_deref(), Some("user123"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod claims;
pub mod error;
pub mod role;
pub mod session;

pub use claims::{ClaimSchema, DecodedToken, FlatClaims, NestedClaims, SessionClaims, TapisClaims};
pub use error::{CoreError, Result};
pub use role::{resolve_role, Role};
pub use session::{SessionVariables, SESSION_CACHE_MAX_AGE_SECS};
