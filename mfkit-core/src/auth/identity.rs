//! Local identity records used to enrich a credential.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::credential::Credential;
use crate::error::MfKitError;

/// One entry of the identity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Identifier embedded in credentials as `_<id>_`.
    pub id: String,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Primary role.
    #[serde(default)]
    pub role: String,
    /// Granted permissions.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Application configuration written to the `app` scope.
    #[serde(default)]
    pub app_config: Value,
}

impl IdentityRecord {
    /// The value written to the `user` scope.
    #[must_use]
    pub fn user_profile(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "name": self.name,
            "role": self.role,
            "permissions": self.permissions,
        })
    }

    /// The value written to the `permissions` scope: every permission mapped
    /// to `true`.
    #[must_use]
    pub fn permission_map(&self) -> Value {
        Value::Object(
            self.permissions
                .iter()
                .map(|permission| (permission.clone(), Value::Bool(true)))
                .collect::<Map<String, Value>>(),
        )
    }
}

/// The identity table, in lookup order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityTable {
    records: Vec<IdentityRecord>,
}

impl IdentityTable {
    /// Wraps a list of records.
    #[must_use]
    pub const fn new(records: Vec<IdentityRecord>) -> Self {
        Self { records }
    }

    /// Parses a JSON array of records.
    ///
    /// # Errors
    ///
    /// Returns [`MfKitError::InvalidConfig`] if the JSON is not an array of
    /// records.
    pub fn from_json(json: &str) -> Result<Self, MfKitError> {
        serde_json::from_str(json)
            .map(Self::new)
            .map_err(|err| MfKitError::InvalidConfig(format!("identity table: {err}")))
    }

    /// First record whose id is embedded in `credential`.
    #[must_use]
    pub fn find_for_credential(&self, credential: &Credential) -> Option<&IdentityRecord> {
        self.records
            .iter()
            .find(|record| credential.embeds_identity(&record.id))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
