//! Typed get/set/subscribe over scopes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::migration::{MigrationEngine, MigrationReport};
use super::namespace::KeyResolver;
use super::strategy::StrategyLedger;
use super::subscription::{FnListener, ScopeChange, ScopeSubscription};
use super::{decode_value, encode_value};
use crate::config::SyncConfig;
use crate::platform::{PlatformResult, SharedStore, StoreListener};
use crate::Scope;

/// Scope-level access to the shared store.
///
/// Reads never fail: store errors are logged and read as "no data". Writes
/// only ever target the current key of a scope.
pub struct ScopedStore {
    resolver: KeyResolver,
    migration: MigrationEngine,
    ledger: StrategyLedger,
}

impl ScopedStore {
    /// Wraps a resolver with a fresh migration engine and strategy ledger.
    #[must_use]
    pub fn new(resolver: KeyResolver) -> Self {
        Self {
            resolver,
            migration: MigrationEngine::new(),
            ledger: StrategyLedger::new(),
        }
    }

    /// Builds the accessor for `store` using the namespaces in `config`.
    #[must_use]
    pub fn from_config(store: Arc<dyn SharedStore>, config: &SyncConfig) -> Self {
        Self::new(KeyResolver::new(
            store,
            config.app_namespace.clone(),
            config.shell_namespace.clone(),
            config.standalone_storage_key.clone(),
        ))
    }

    /// The key resolver.
    #[must_use]
    pub const fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// The migration engine.
    #[must_use]
    pub const fn migration(&self) -> &MigrationEngine {
        &self.migration
    }

    fn store(&self) -> &dyn SharedStore {
        self.resolver.store().as_ref()
    }

    /// Runs the migration pass if it has not run yet.
    #[must_use]
    pub fn ensure_migrated(&self) -> MigrationReport {
        self.migration.ensure_migrated(&self.resolver, &self.ledger)
    }

    fn migrate_once(&self) {
        let report = self.ensure_migrated();
        if report.ran {
            log::debug!(
                "migration pass: {} scope(s) migrated, {} failed",
                report.migrated.len(),
                report.failed.len()
            );
        }
    }

    /// Reads `scope`, falling back to its first legacy key when the current
    /// key is empty.
    #[must_use]
    pub fn get(&self, scope: Scope) -> Option<Value> {
        self.migrate_once();
        let keys = self.resolver.resolve(scope);
        if let Some(value) = self.read_key(&keys.current) {
            return Some(value);
        }
        keys.legacy.first().and_then(|key| self.read_key(key))
    }

    /// Reads `scope` and decodes it into `T`. Undecodable values read as `None`.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, scope: Scope) -> Option<T> {
        let value = self.get(scope)?;
        serde_json::from_value(value)
            .inspect_err(|err| log::warn!("scope {scope} holds an unexpected shape: {err}"))
            .ok()
    }

    /// Reads the current key of `scope` directly, without migration or
    /// fallback, surfacing store errors.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the read fails.
    pub fn read_current(&self, scope: Scope) -> PlatformResult<Option<Value>> {
        Ok(decode_value(self.store().get(scope.to_string())?))
    }

    fn read_key(&self, key: &str) -> Option<Value> {
        match self.store().get(key.to_string()) {
            Ok(raw) => decode_value(raw),
            Err(err) => {
                log::warn!("read of {key} failed, treating as empty: {err}");
                None
            }
        }
    }

    /// Writes `value` to the current key of `scope`, declaring the scope's
    /// strategy first if this process has not done so yet. A rejected
    /// declaration is logged and retried on the next write.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the write fails.
    pub fn set(&self, scope: Scope, value: &Value) -> PlatformResult<()> {
        self.migrate_once();
        let current = self.resolver.resolve(scope).current;
        if let Err(err) = self.ledger.ensure_declared(self.store(), scope, &current) {
            log::warn!("strategy for {current} not declared, writing anyway: {err}");
        }
        self.store().set(current, encode_value(value)?)
    }

    /// Serializes `value` and writes it to `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn set_as<T: Serialize>(&self, scope: Scope, value: &T) -> PlatformResult<()> {
        self.set(scope, &serde_json::to_value(value)?)
    }

    /// Registers `listener` on the current key and every legacy key of `scope`.
    ///
    /// Keys that refuse the registration are logged and skipped.
    #[must_use]
    pub fn subscribe(&self, scope: Scope, listener: Arc<dyn StoreListener>) -> ScopeSubscription {
        self.migrate_once();
        let keys = self.resolver.resolve(scope);
        let registrations = keys
            .all()
            .filter_map(|key| {
                match self.store().subscribe(key.to_string(), Arc::clone(&listener)) {
                    Ok(registration) => Some((key.to_string(), registration)),
                    Err(err) => {
                        log::warn!("failed to subscribe to {key}: {err}");
                        None
                    }
                }
            })
            .collect();
        ScopeSubscription::new(scope, registrations)
    }

    /// Subscribes a closure to `scope`.
    #[must_use]
    pub fn subscribe_fn<F>(&self, scope: Scope, callback: F) -> ScopeSubscription
    where
        F: Fn(ScopeChange) + Send + Sync + 'static,
    {
        self.subscribe(scope, Arc::new(FnListener::new(scope, callback)))
    }

    /// Removes every store key starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn clear_by_prefix(&self, prefix: &str) -> PlatformResult<()> {
        self.store().clear_by_prefix(prefix.to_string())
    }

    /// Removes all data persisted under `storage_namespace`.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn clear_app_data(&self, storage_namespace: &str) -> PlatformResult<()> {
        self.store().clear_app_data(storage_namespace.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::platform::memory::MemorySharedStore;
    use crate::platform::StoreStrategy;

    fn scoped(store: &MemorySharedStore) -> ScopedStore {
        ScopedStore::from_config(Arc::new(store.clone()), &SyncConfig::default())
    }

    #[test_case(Scope::User, "mf-template-userinfo" ; "user")]
    #[test_case(Scope::App, "mf-template-appconfig" ; "app")]
    #[test_case(Scope::Permissions, "mf-template-permissions" ; "permissions")]
    #[test_case(Scope::Token, "mf-template-token" ; "token")]
    fn test_get_returns_migrated_legacy_value(scope: Scope, legacy: &str) {
        let store = MemorySharedStore::initialized("mf-template-store");
        store.seed(legacy, &json!({"from": "legacy"}));
        let scoped = scoped(&store);

        assert_eq!(scoped.get(scope), Some(json!({"from": "legacy"})));
        assert_eq!(store.value(&scope.to_string()), Some(json!({"from": "legacy"})));
        assert!(scoped.migration().state().is_migrated());
    }

    #[test_case(Scope::User ; "user")]
    #[test_case(Scope::App ; "app")]
    #[test_case(Scope::Permissions ; "permissions")]
    #[test_case(Scope::Token ; "token")]
    fn test_current_takes_precedence(scope: Scope) {
        let store = MemorySharedStore::initialized("mf-template-store");
        store.seed(&scope.to_string(), &json!("current"));
        store.seed(&format!("mf-template-{}", scope.legacy_suffix()), &json!("legacy"));

        assert_eq!(scoped(&store).get(scope), Some(json!("current")));
    }

    #[test_case(Scope::User ; "user")]
    #[test_case(Scope::App ; "app")]
    #[test_case(Scope::Permissions ; "permissions")]
    #[test_case(Scope::Token ; "token")]
    fn test_set_then_get(scope: Scope) {
        let store = MemorySharedStore::initialized("mf-template-store");
        let scoped = scoped(&store);
        let _ = scoped.ensure_migrated();

        scoped.set(scope, &json!({"v": 1})).expect("set");

        assert_eq!(scoped.get(scope), Some(json!({"v": 1})));
        assert_eq!(store.strategy(&scope.to_string()), Some(scope.strategy()));
    }

    #[test]
    fn test_set_never_writes_legacy_keys() {
        let store = MemorySharedStore::initialized("mf-shell-store");
        let scoped = scoped(&store);
        scoped.set(Scope::Token, &json!("tok")).expect("set");
        assert_eq!(store.write_log(), vec!["token".to_string()]);
    }

    #[test]
    fn test_get_falls_back_when_migration_could_not_write() {
        let store = MemorySharedStore::initialized("mf-template-store");
        store.seed("mf-template-token", &json!("legacy-token"));
        store.fail_key("token");
        let scoped = scoped(&store);

        assert_eq!(scoped.get(Scope::Token), Some(json!("legacy-token")));
    }

    #[test]
    fn test_rejected_strategy_does_not_block_the_write() {
        let store = MemorySharedStore::initialized("mf-shell-store");
        store.set_reject_strategies(true);
        let scoped = scoped(&store);

        scoped.set(Scope::Token, &json!("tok_42_abc")).expect("set");
        assert_eq!(store.value("token"), Some(json!("tok_42_abc")));
        assert_eq!(store.strategy("token"), None);

        store.set_reject_strategies(false);
        scoped.set(Scope::Token, &json!("tok_43_abc")).expect("set");
        assert_eq!(store.strategy("token"), Some(StoreStrategy::ENCRYPTED));
    }

    #[test]
    fn test_unavailable_store_reads_as_empty() {
        let store = MemorySharedStore::initialized("mf-template-store");
        store.set_unavailable(true);
        let scoped = scoped(&store);
        assert_eq!(scoped.get(Scope::User), None);
        assert!(scoped.read_current(Scope::User).is_err());
        assert!(scoped.set(Scope::User, &json!(1)).is_err());
    }

    #[test]
    fn test_get_as_decodes_typed_values() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct AppConfig {
            theme: String,
        }

        let store = MemorySharedStore::initialized("mf-template-store");
        store.seed("app", &json!({"theme": "dark", "language": "en"}));
        let scoped = scoped(&store);

        assert_eq!(
            scoped.get_as::<AppConfig>(Scope::App),
            Some(AppConfig {
                theme: "dark".to_string()
            })
        );
        assert_eq!(scoped.get_as::<Vec<u8>>(Scope::App), None);
    }

    #[test]
    fn test_subscription_fires_until_unsubscribed() {
        let store = MemorySharedStore::initialized("mf-template-store");
        let scoped = scoped(&store);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        let subscription = scoped.subscribe_fn(Scope::User, move |_change| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(
            subscription.keys(),
            vec!["user", "mf-template-userinfo", "g:sh:user"]
        );

        scoped.set(Scope::User, &json!({"name": "Ada"})).expect("set");
        let after_write = fired.load(Ordering::SeqCst);
        assert!(after_write >= 1);

        subscription.unsubscribe();
        scoped.set(Scope::User, &json!({"name": "Grace"})).expect("set");
        assert_eq!(fired.load(Ordering::SeqCst), after_write);
        assert_eq!(store.listener_count("user"), 0);
        assert_eq!(store.listener_count("g:sh:user"), 0);
    }

    #[test]
    fn test_failing_disposal_still_detaches_every_key() {
        let store = MemorySharedStore::initialized("mf-template-store");
        let scoped = scoped(&store);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let subscription = scoped.subscribe_fn(Scope::Token, move |_change| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(store.listener_count("mf-template-token"), 1);

        store.set_fail_dispose(true);
        subscription.unsubscribe();

        assert!(!subscription.is_active());
        for key in ["token", "mf-template-token", "g:sh:token"] {
            assert_eq!(store.listener_count(key), 0, "{key}");
            store.set(key.to_string(), r#""late""#.to_string()).expect("set");
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_sees_legacy_writes_from_older_siblings() {
        let store = MemorySharedStore::initialized("mf-template-store");
        let scoped = scoped(&store);
        let keys = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&keys);
        let _subscription = scoped.subscribe_fn(Scope::App, move |change| {
            sink.lock().expect("lock").push(change.key);
        });

        store
            .set("mf-template-appconfig".to_string(), r#"{"theme":"light"}"#.to_string())
            .expect("set");

        assert_eq!(*keys.lock().expect("lock"), vec!["mf-template-appconfig".to_string()]);
    }

    #[test]
    fn test_listener_may_read_reentrantly() {
        let store = MemorySharedStore::initialized("mf-template-store");
        store.seed("mf-template-userinfo", &json!({"name": "legacy"}));
        let scoped = Arc::new(scoped(&store));
        let seen = Arc::new(std::sync::Mutex::new(None));
        let (reader, sink) = (Arc::clone(&scoped), Arc::clone(&seen));

        let _subscription = scoped.subscribe_fn(Scope::User, move |_| {
            *sink.lock().expect("lock") = reader.get(Scope::User);
        });
        scoped.set(Scope::User, &json!({"name": "fresh"})).expect("set");

        assert_eq!(*seen.lock().expect("lock"), Some(json!({"name": "fresh"})));
    }
}
