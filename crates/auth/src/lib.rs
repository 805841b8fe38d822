//! `gymdesk-auth`: authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it verifies shared-secret
//! bearer tokens, derives the caller's principal (user, branch scope, roles) and
//! answers permission checks.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::{Role, permissions_for_roles};
