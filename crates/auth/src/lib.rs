//! `softgate-auth`: identity and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. The API layer
//! turns a bearer token into a [`Principal`] and asks [`authorize`] whether it
//! may perform an action.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use principal::PrincipalId;
pub use roles::{Role, permissions_for_roles};
