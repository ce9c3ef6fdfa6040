use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; [`permissions_for_roles`] is the
/// policy that maps them onto permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const USER: Role = Role(Cow::Borrowed("user"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Built-in role → permission mapping.
///
/// Convention: "admin" grants everything. "user" and unknown roles grant
/// nothing; custom roles with individual flags live in the RBAC store, not here.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(|r| *r == Role::ADMIN) {
        return vec![Permission::WILDCARD];
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gets_wildcard() {
        let perms = permissions_for_roles(&[Role::USER, Role::ADMIN]);
        assert_eq!(perms, vec![Permission::WILDCARD]);
    }

    #[test]
    fn plain_user_gets_nothing() {
        assert!(permissions_for_roles(&[Role::USER]).is_empty());
        assert!(permissions_for_roles(&[Role::new("viewer")]).is_empty());
    }
}
