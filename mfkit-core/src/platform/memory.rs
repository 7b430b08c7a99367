//! In-memory implementations of the platform traits.
//!
//! Used by the test-suite and the developer CLI. They model the observable
//! contract of the browser collaborators (synchronous change notification,
//! strategy declarations, history replacement) without any persistence.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::error::{PlatformError, PlatformResult};
use super::traits::{
    BrowserLocation, ParentFrame, PlatformProvider, SessionStorage, SharedStore,
    StoreListener, StoreSubscription,
};
use super::types::{StoreInitOptions, StoreStrategy};

fn lock<T>(mutex: &Mutex<T>) -> PlatformResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| PlatformError::Store("mutex poisoned".to_string()))
}

// =============================================================================
// Shared store
// =============================================================================

#[derive(Default)]
struct StoreState {
    values: BTreeMap<String, String>,
    strategies: HashMap<String, StoreStrategy>,
    listeners: HashMap<String, Vec<(u64, Arc<dyn StoreListener>)>>,
    options: Option<StoreInitOptions>,
    failing_keys: HashSet<String>,
    write_log: Vec<String>,
}

#[derive(Default)]
struct MemoryStoreInner {
    state: Mutex<StoreState>,
    next_subscription: AtomicU64,
    unavailable: AtomicBool,
    fail_dispose: AtomicBool,
    reject_strategies: AtomicBool,
}

impl MemoryStoreInner {
    fn check_available(&self) -> PlatformResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable(
                "store module not loaded".to_string(),
            ));
        }
        Ok(())
    }

    fn check_key(state: &StoreState, key: &str) -> PlatformResult<()> {
        if state.failing_keys.contains(key) {
            return Err(PlatformError::Store(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn remove_listener(&self, key: &str, id: u64) -> PlatformResult<()> {
        let mut state = lock(&self.state)?;
        if let Some(entries) = state.listeners.get_mut(key) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
        Ok(())
    }
}

/// In-memory shared store with synchronous change notification.
///
/// Listeners are invoked after the internal lock is released, so a listener
/// may read from or write to the store re-entrantly.
#[derive(Clone, Default)]
pub struct MemorySharedStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemorySharedStore {
    /// Creates a store that the host has not initialized yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that is already initialized with `storage_key`.
    #[must_use]
    pub fn initialized(storage_key: &str) -> Self {
        let store = Self::new();
        if let Ok(mut state) = lock(&store.inner.state) {
            state.options = Some(StoreInitOptions {
                enable_persistence: true,
                enable_encryption: true,
                storage_key: storage_key.to_string(),
            });
        }
        store
    }

    /// Seeds a raw JSON value without notifying listeners.
    pub fn seed(&self, key: &str, value: &serde_json::Value) {
        if let Ok(mut state) = lock(&self.inner.state) {
            state.values.insert(key.to_string(), value.to_string());
        }
    }

    /// Returns the decoded value under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        let state = lock(&self.inner.state).ok()?;
        state
            .values
            .get(key)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Returns every stored key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        lock(&self.inner.state)
            .map(|state| state.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the strategy last declared for `key`.
    #[must_use]
    pub fn strategy(&self, key: &str) -> Option<StoreStrategy> {
        lock(&self.inner.state)
            .ok()
            .and_then(|state| state.strategies.get(key).copied())
    }

    /// Keys written through [`SharedStore::set`], in order.
    #[must_use]
    pub fn write_log(&self) -> Vec<String> {
        lock(&self.inner.state)
            .map(|state| state.write_log.clone())
            .unwrap_or_default()
    }

    /// Number of live listener registrations on `key`.
    #[must_use]
    pub fn listener_count(&self, key: &str) -> usize {
        lock(&self.inner.state)
            .ok()
            .and_then(|state| state.listeners.get(key).map(Vec::len))
            .unwrap_or(0)
    }

    /// Makes every operation fail as if the store module failed to load.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes reads and writes of `key` fail.
    pub fn fail_key(&self, key: &str) {
        if let Ok(mut state) = lock(&self.inner.state) {
            state.failing_keys.insert(key.to_string());
        }
    }

    /// Makes [`SharedStore::configure_strategy`] fail; plain writes still work.
    pub fn set_reject_strategies(&self, reject: bool) {
        self.inner.reject_strategies.store(reject, Ordering::SeqCst);
    }

    /// Makes [`StoreSubscription::dispose`] fail (after detaching the listener).
    pub fn set_fail_dispose(&self, fail: bool) {
        self.inner.fail_dispose.store(fail, Ordering::SeqCst);
    }
}

impl SharedStore for MemorySharedStore {
    fn get(&self, key: String) -> PlatformResult<Option<String>> {
        self.inner.check_available()?;
        let state = lock(&self.inner.state)?;
        MemoryStoreInner::check_key(&state, &key)?;
        Ok(state.values.get(&key).cloned())
    }

    fn set(&self, key: String, value: String) -> PlatformResult<()> {
        self.inner.check_available()?;
        let (old_value, listeners) = {
            let mut state = lock(&self.inner.state)?;
            MemoryStoreInner::check_key(&state, &key)?;
            let old_value = state.values.insert(key.clone(), value.clone());
            state.write_log.push(key.clone());
            let listeners: Vec<Arc<dyn StoreListener>> = state
                .listeners
                .get(&key)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default();
            (old_value, listeners)
        };
        for listener in listeners {
            listener.on_change(key.clone(), Some(value.clone()), old_value.clone());
        }
        Ok(())
    }

    fn subscribe(
        &self,
        key: String,
        listener: Arc<dyn StoreListener>,
    ) -> PlatformResult<Arc<dyn StoreSubscription>> {
        self.inner.check_available()?;
        let id = self.inner.next_subscription.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.state)?
            .listeners
            .entry(key.clone())
            .or_default()
            .push((id, listener));
        Ok(Arc::new(MemorySubscription {
            store: Arc::downgrade(&self.inner),
            key,
            id,
        }))
    }

    fn configure_strategy(&self, key: String, strategy: StoreStrategy) -> PlatformResult<()> {
        self.inner.check_available()?;
        if self.inner.reject_strategies.load(Ordering::SeqCst) {
            return Err(PlatformError::Store(format!("strategy rejected for {key}")));
        }
        lock(&self.inner.state)?.strategies.insert(key, strategy);
        Ok(())
    }

    fn clear_by_prefix(&self, prefix: String) -> PlatformResult<()> {
        self.inner.check_available()?;
        lock(&self.inner.state)?
            .values
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    fn clear_app_data(&self, storage_namespace: String) -> PlatformResult<()> {
        self.inner.check_available()?;
        let mut state = lock(&self.inner.state)?;
        let owns_namespace = state
            .options
            .as_ref()
            .is_some_and(|options| options.storage_key == storage_namespace);
        if owns_namespace {
            state.values.clear();
            state.strategies.clear();
        }
        Ok(())
    }

    fn init(&self, options: StoreInitOptions) -> PlatformResult<()> {
        self.inner.check_available()?;
        lock(&self.inner.state)?.options = Some(options);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        !self.inner.unavailable.load(Ordering::SeqCst)
            && lock(&self.inner.state).is_ok_and(|state| state.options.is_some())
    }

    fn storage_key(&self) -> PlatformResult<Option<String>> {
        self.inner.check_available()?;
        Ok(lock(&self.inner.state)?
            .options
            .as_ref()
            .map(|options| options.storage_key.clone()))
    }
}

struct MemorySubscription {
    store: Weak<MemoryStoreInner>,
    key: String,
    id: u64,
}

impl StoreSubscription for MemorySubscription {
    fn dispose(&self) -> PlatformResult<()> {
        let Some(store) = self.store.upgrade() else {
            return Ok(());
        };
        store.remove_listener(&self.key, self.id)?;
        if store.fail_dispose.load(Ordering::SeqCst) {
            return Err(PlatformError::Store(format!(
                "injected dispose failure for {}",
                self.key
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Session storage
// =============================================================================

/// In-memory `sessionStorage`.
#[derive(Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
    denied: AtomicBool,
}

impl MemorySessionStorage {
    /// Creates empty session storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every access fail, as in a sandboxed iframe.
    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    fn items(&self) -> PlatformResult<MutexGuard<'_, HashMap<String, String>>> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(PlatformError::Session("access denied".to_string()));
        }
        self.items
            .lock()
            .map_err(|_| PlatformError::Session("mutex poisoned".to_string()))
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: String) -> PlatformResult<Option<String>> {
        Ok(self.items()?.get(&key).cloned())
    }

    fn set_item(&self, key: String, value: String) -> PlatformResult<()> {
        self.items()?.insert(key, value);
        Ok(())
    }

    fn remove_item(&self, key: String) -> PlatformResult<()> {
        self.items()?.remove(&key);
        Ok(())
    }
}

// =============================================================================
// Location
// =============================================================================

/// In-memory location that records history replacements and navigations.
pub struct MemoryLocation {
    href: Mutex<String>,
    replaced: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
}

impl MemoryLocation {
    /// Creates a location currently showing `href`.
    #[must_use]
    pub fn new(href: &str) -> Self {
        Self {
            href: Mutex::new(href.to_string()),
            replaced: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// The URL currently shown in the address bar.
    #[must_use]
    pub fn current(&self) -> String {
        self.href.lock().map(|href| href.clone()).unwrap_or_default()
    }

    /// Every URL passed to `replace_state`, in order.
    #[must_use]
    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Every URL passed to `assign`, in order.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl BrowserLocation for MemoryLocation {
    fn href(&self) -> PlatformResult<String> {
        self.href
            .lock()
            .map(|href| href.clone())
            .map_err(|_| PlatformError::Location("mutex poisoned".to_string()))
    }

    fn replace_state(&self, url: String) -> PlatformResult<()> {
        let mut href = self
            .href
            .lock()
            .map_err(|_| PlatformError::Location("mutex poisoned".to_string()))?;
        href.clone_from(&url);
        self.replaced
            .lock()
            .map_err(|_| PlatformError::Location("mutex poisoned".to_string()))?
            .push(url);
        Ok(())
    }

    fn assign(&self, url: String) -> PlatformResult<()> {
        self.navigations
            .lock()
            .map_err(|_| PlatformError::Location("mutex poisoned".to_string()))?
            .push(url);
        Ok(())
    }
}

// =============================================================================
// Parent frame
// =============================================================================

/// In-memory parent frame collecting posted messages.
#[derive(Default)]
pub struct MemoryParentFrame {
    present: bool,
    messages: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryParentFrame {
    /// A frame handle; `present` tells whether a parent exists.
    #[must_use]
    pub fn new(present: bool) -> Self {
        Self {
            present,
            ..Self::default()
        }
    }

    /// Makes `post_message` fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl ParentFrame for MemoryParentFrame {
    fn has_parent(&self) -> bool {
        self.present
    }

    fn post_message(&self, message: String) -> PlatformResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlatformError::Frame("postMessage rejected".to_string()));
        }
        self.messages
            .lock()
            .map_err(|_| PlatformError::Frame("mutex poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

// =============================================================================
// Provider
// =============================================================================

/// All in-memory components bundled as a [`PlatformProvider`].
#[derive(Clone)]
pub struct MemoryPlatform {
    /// Shared store.
    pub store: MemorySharedStore,
    /// Session storage.
    pub session: Arc<MemorySessionStorage>,
    /// Page location.
    pub location: Arc<MemoryLocation>,
    /// Parent frame.
    pub frame: Arc<MemoryParentFrame>,
}

impl MemoryPlatform {
    /// A standalone page at `href` with an uninitialized store and no parent.
    #[must_use]
    pub fn new(href: &str) -> Self {
        Self {
            store: MemorySharedStore::new(),
            session: Arc::new(MemorySessionStorage::new()),
            location: Arc::new(MemoryLocation::new(href)),
            frame: Arc::new(MemoryParentFrame::new(false)),
        }
    }

    /// A page at `href` embedded in a shell whose store uses `storage_key`.
    #[must_use]
    pub fn embedded(href: &str, storage_key: &str) -> Self {
        Self {
            store: MemorySharedStore::initialized(storage_key),
            session: Arc::new(MemorySessionStorage::new()),
            location: Arc::new(MemoryLocation::new(href)),
            frame: Arc::new(MemoryParentFrame::new(true)),
        }
    }
}

impl PlatformProvider for MemoryPlatform {
    fn shared_store(&self) -> Arc<dyn SharedStore> {
        Arc::new(self.store.clone())
    }

    fn session_storage(&self) -> Arc<dyn SessionStorage> {
        self.session.clone()
    }

    fn location(&self) -> Arc<dyn BrowserLocation> {
        self.location.clone()
    }

    fn parent_frame(&self) -> Arc<dyn ParentFrame> {
        self.frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    struct Counter(AtomicUsize);

    impl StoreListener for Counter {
        fn on_change(&self, _key: String, _new: Option<String>, _old: Option<String>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_set_notifies_and_dispose_detaches() {
        let store = MemorySharedStore::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let sub = store
            .subscribe("user".to_string(), counter.clone())
            .expect("subscribe");
        store.set("user".to_string(), "1".to_string()).expect("set");
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        sub.dispose().expect("dispose");
        store.set("user".to_string(), "2".to_string()).expect("set");
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count("user"), 0);
    }

    #[test]
    fn test_unavailable_store_fails_everything() {
        let store = MemorySharedStore::initialized("mf-template-store");
        store.set_unavailable(true);
        assert!(store.get("user".to_string()).is_err());
        assert!(store.storage_key().is_err());
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_clear_app_data_only_for_owned_namespace() {
        let store = MemorySharedStore::initialized("mf-shell-store");
        store.seed("user", &serde_json::json!({"name": "x"}));
        store
            .clear_app_data("mf-template-store".to_string())
            .expect("clear");
        assert!(store.value("user").is_some());
        store.clear_app_data("mf-shell-store".to_string()).expect("clear");
        assert!(store.value("user").is_none());
    }

    #[test]
    fn test_location_records_replacements() {
        let location = MemoryLocation::new("https://app.test/?token=a");
        location
            .replace_state("https://app.test/".to_string())
            .expect("replace");
        assert_eq!(location.current(), "https://app.test/");
        assert_eq!(location.replaced(), vec!["https://app.test/".to_string()]);
        assert!(location.navigations().is_empty());
    }
}
