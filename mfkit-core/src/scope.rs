use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::platform::StoreStrategy;

/// A logical category of state shared with the shell.
///
/// Exactly four scopes exist. Adding one requires a legacy mapping in
/// [`crate::store::KeyResolver`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    uniffi::Enum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
    /// The signed-in user's profile.
    User,
    /// Application configuration (theme, language, ...).
    App,
    /// Permission map (`permission -> true`).
    Permissions,
    /// The session credential.
    Token,
}

impl Scope {
    /// Every scope, in migration order.
    pub const ALL: [Self; 4] = [Self::User, Self::App, Self::Permissions, Self::Token];

    /// Suffix used by the `<namespace>-<suffix>` legacy keys.
    #[must_use]
    pub const fn legacy_suffix(self) -> &'static str {
        match self {
            Self::User => "userinfo",
            Self::App => "appconfig",
            Self::Permissions => "permissions",
            Self::Token => "token",
        }
    }

    /// Persistence strategy for the scope's current key.
    #[must_use]
    pub const fn strategy(self) -> StoreStrategy {
        match self {
            Self::User | Self::Token => StoreStrategy::ENCRYPTED,
            Self::App | Self::Permissions => StoreStrategy::PLAIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_string_forms() {
        assert_eq!(Scope::Permissions.to_string(), "permissions");
        assert_eq!(Scope::from_str("token").expect("parse"), Scope::Token);
        assert!(Scope::from_str("roles").is_err());
    }

    #[test]
    fn test_iteration_matches_migration_order() {
        let iterated: Vec<Scope> = Scope::iter().collect();
        assert_eq!(iterated, Scope::ALL.to_vec());
    }

    #[test]
    fn test_sensitive_scopes_are_encrypted() {
        assert!(Scope::User.strategy().encrypted);
        assert!(Scope::Token.strategy().encrypted);
        assert!(!Scope::App.strategy().encrypted);
        assert!(!Scope::Permissions.strategy().encrypted);
    }
}
