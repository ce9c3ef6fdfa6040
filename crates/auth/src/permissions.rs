use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "users.edit").
/// A special wildcard permission `"*"` can be used by policy layers to indicate
/// "allow all" without hardcoding every capability into a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub const ROLES_ADD: Permission = Permission(Cow::Borrowed("roles.add"));
    pub const ROLES_EDIT: Permission = Permission(Cow::Borrowed("roles.edit"));
    pub const ROLES_DELETE: Permission = Permission(Cow::Borrowed("roles.delete"));
    pub const USERS_ADD: Permission = Permission(Cow::Borrowed("users.add"));
    pub const USERS_EDIT: Permission = Permission(Cow::Borrowed("users.edit"));
    pub const USERS_DELETE: Permission = Permission(Cow::Borrowed("users.delete"));

    /// Launch administrative commands over the command socket.
    pub const COMMANDS_RUN: Permission = Permission(Cow::Borrowed("commands.run"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission definition (for listing/display).
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub permission: Permission,
    pub description: &'static str,
}

/// Every capability a role can carry, in display order.
pub fn catalogue() -> Vec<PermissionDefinition> {
    [
        (Permission::ROLES_ADD, "Add roles"),
        (Permission::ROLES_EDIT, "Edit roles"),
        (Permission::ROLES_DELETE, "Delete roles"),
        (Permission::USERS_ADD, "Add users"),
        (Permission::USERS_EDIT, "Edit users"),
        (Permission::USERS_DELETE, "Delete users"),
        (Permission::COMMANDS_RUN, "Run administrative commands"),
    ]
    .into_iter()
    .map(|(permission, description)| PermissionDefinition {
        permission,
        description,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_names_are_unique_and_never_wildcard() {
        let defs = catalogue();
        let mut names: Vec<&str> = defs.iter().map(|d| d.permission.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), defs.len());
        assert!(defs.iter().all(|d| !d.permission.is_wildcard()));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Permission::COMMANDS_RUN).unwrap();
        assert_eq!(json, "\"commands.run\"");
    }
}
