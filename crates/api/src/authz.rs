//! API-side authorization guard.
//!
//! Enforces permissions at the route boundary (before any work starts), while
//! keeping the command core auth-agnostic.

use softgate_auth::{AuthzError, Permission, Principal, authorize};

use crate::context::PrincipalContext;

/// Check that the request principal holds `permission`.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    let principal = Principal::from_roles(principal.principal_id(), principal.roles().to_vec());
    authorize(&principal, permission)
}
