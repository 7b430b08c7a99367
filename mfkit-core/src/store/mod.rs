//! Scoped access to the shared store.
//!
//! Every read, write and subscription goes through the [`KeyResolver`] and
//! the [`MigrationEngine`], so callers only ever deal in [`crate::Scope`]s.

mod accessor;
mod migration;
mod namespace;
mod strategy;
mod subscription;

pub use accessor::ScopedStore;
pub use migration::{MigrationEngine, MigrationReport, MigrationState};
pub use namespace::{KeyResolver, RuntimeMode, ScopeKeys};
pub use strategy::StrategyLedger;
pub use subscription::{FnListener, ScopeChange, ScopeSubscription};

use serde_json::Value;

use crate::platform::PlatformResult;

/// Decodes a raw store value. Absent, blank and JSON `null` values are empty.
///
/// Text that is not JSON is kept as a string; older writers stored bare
/// strings.
pub(crate) fn decode_value(raw: Option<String>) -> Option<Value> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&raw) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(raw)),
    }
}

pub(crate) fn encode_value(value: &Value) -> PlatformResult<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value(None), None);
        assert_eq!(decode_value(Some(String::new())), None);
        assert_eq!(decode_value(Some("null".to_string())), None);
        assert_eq!(decode_value(Some(r#"{"a":1}"#.to_string())), Some(json!({"a": 1})));
        assert_eq!(
            decode_value(Some("tok_bare".to_string())),
            Some(json!("tok_bare"))
        );
    }
}
