//! Permission and role checks over the hydrated scopes.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::store::ScopedStore;
use crate::Scope;

/// Snapshot of the signed-in user's permissions and roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    granted: BTreeMap<String, bool>,
    roles: Vec<String>,
}

impl Permissions {
    /// Builds a snapshot from a permission map and a user profile.
    ///
    /// Roles come from `user.roles` when present, otherwise from `user.role`.
    #[must_use]
    pub fn from_values(permissions: Option<&Value>, user: Option<&Value>) -> Self {
        let granted = permissions
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(name, value)| (name.clone(), value.as_bool().unwrap_or(false)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            granted,
            roles: user.map(roles_of).unwrap_or_default(),
        }
    }

    /// Reads the `permissions` and `user` scopes.
    #[must_use]
    pub fn load(store: &ScopedStore) -> Self {
        Self::from_values(
            store.get(Scope::Permissions).as_ref(),
            store.get(Scope::User).as_ref(),
        )
    }

    /// Whether `permission` is explicitly granted.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.granted.get(permission).copied().unwrap_or(false)
    }

    /// Whether the user holds any of `required`. An empty requirement always
    /// passes.
    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.is_empty()
            || required
                .iter()
                .any(|role| self.roles.iter().any(|held| held == role.as_ref()))
    }

    /// Roles held by the user.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}

fn roles_of(user: &Value) -> Vec<String> {
    if let Some(roles) = user.get("roles").and_then(Value::as_array) {
        return roles
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    user.get("role")
        .and_then(Value::as_str)
        .filter(|role| !role.is_empty())
        .map(|role| vec![role.to_string()])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_only_explicit_true_grants() {
        let permissions = Permissions::from_values(
            Some(&json!({"template:read": true, "template:write": "yes", "template:admin": false})),
            None,
        );
        assert!(permissions.has_permission("template:read"));
        assert!(!permissions.has_permission("template:write"));
        assert!(!permissions.has_permission("template:admin"));
        assert!(!permissions.has_permission("other"));
    }

    #[test]
    fn test_roles_prefer_list() {
        let permissions =
            Permissions::from_values(None, Some(&json!({"role": "user", "roles": ["admin", "ops"]})));
        assert_eq!(permissions.roles(), ["admin", "ops"]);
        assert!(permissions.has_any_role(&["guest", "ops"]));
        assert!(!permissions.has_any_role(&["user"]));
    }

    #[test]
    fn test_single_role_and_empty_requirement() {
        let permissions = Permissions::from_values(None, Some(&json!({"role": "user"})));
        assert!(permissions.has_any_role(&["user"]));
        assert!(permissions.has_any_role::<&str>(&[]));
        assert!(Permissions::default().has_any_role::<String>(&[]));
        assert!(!Permissions::default().has_any_role(&["user"]));
    }
}
