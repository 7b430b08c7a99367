//! Platform interfaces consumed by the synchronization layer.

use std::sync::Arc;

use super::error::PlatformResult;
use super::types::{StoreInitOptions, StoreStrategy};

/// The shared, browser-resident key-value store owned by the shell.
///
/// Values cross this boundary as JSON text. `None` means the key is absent.
#[uniffi::export(with_foreign)]
pub trait SharedStore: Send + Sync {
    /// Reads the JSON value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    fn get(&self, key: String) -> PlatformResult<Option<String>>;

    /// Writes a JSON value under `key`, notifying subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    fn set(&self, key: String, value: String) -> PlatformResult<()>;

    /// Registers `listener` for changes to `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store refuses the subscription.
    fn subscribe(
        &self,
        key: String,
        listener: Arc<dyn StoreListener>,
    ) -> PlatformResult<Arc<dyn StoreSubscription>>;

    /// Declares how `key` is persisted. Must precede the first write to `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the strategy.
    fn configure_strategy(&self, key: String, strategy: StoreStrategy) -> PlatformResult<()>;

    /// Removes every key starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn clear_by_prefix(&self, prefix: String) -> PlatformResult<()>;

    /// Removes all data persisted under a storage namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn clear_app_data(&self, storage_namespace: String) -> PlatformResult<()>;

    /// Initializes the store. Only called when no host has done so.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    fn init(&self, options: StoreInitOptions) -> PlatformResult<()>;

    /// Whether a store instance is active (provided by the shell or by `init`).
    fn is_initialized(&self) -> bool;

    /// The storage-identity marker of the active store configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be inspected.
    fn storage_key(&self) -> PlatformResult<Option<String>>;
}

/// Receives change notifications from the shared store.
#[uniffi::export(with_foreign)]
pub trait StoreListener: Send + Sync {
    /// Called after `key` changed. Values are JSON text.
    fn on_change(&self, key: String, new_value: Option<String>, old_value: Option<String>);
}

/// A single registration returned by [`SharedStore::subscribe`].
#[uniffi::export(with_foreign)]
pub trait StoreSubscription: Send + Sync {
    /// Stops delivery to the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to tear the registration down.
    fn dispose(&self) -> PlatformResult<()>;
}

/// Tab-scoped string storage (`sessionStorage`).
#[uniffi::export(with_foreign)]
pub trait SessionStorage: Send + Sync {
    /// Reads an item.
    ///
    /// # Errors
    ///
    /// Returns an error if storage access is denied.
    fn get_item(&self, key: String) -> PlatformResult<Option<String>>;

    /// Writes an item.
    ///
    /// # Errors
    ///
    /// Returns an error if storage access is denied or the quota is exceeded.
    fn set_item(&self, key: String, value: String) -> PlatformResult<()>;

    /// Removes an item.
    ///
    /// # Errors
    ///
    /// Returns an error if storage access is denied.
    fn remove_item(&self, key: String) -> PlatformResult<()>;
}

/// The page location and history.
#[uniffi::export(with_foreign)]
pub trait BrowserLocation: Send + Sync {
    /// The full current URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be read.
    fn href(&self) -> PlatformResult<String>;

    /// Replaces the current history entry without navigating.
    ///
    /// # Errors
    ///
    /// Returns an error if the history API rejects the URL.
    fn replace_state(&self, url: String) -> PlatformResult<()>;

    /// Navigates away to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if navigation cannot be started.
    fn assign(&self, url: String) -> PlatformResult<()>;
}

/// The hosting frame, when this application runs inside one.
#[uniffi::export(with_foreign)]
pub trait ParentFrame: Send + Sync {
    /// Whether a distinct parent frame exists.
    fn has_parent(&self) -> bool;

    /// Posts a JSON message to the parent frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be delivered.
    fn post_message(&self, message: String) -> PlatformResult<()>;
}

/// Provider responsible for the platform-specific components.
#[uniffi::export(with_foreign)]
pub trait PlatformProvider: Send + Sync {
    /// Returns the shared store.
    fn shared_store(&self) -> Arc<dyn SharedStore>;

    /// Returns session-scoped storage.
    fn session_storage(&self) -> Arc<dyn SessionStorage>;

    /// Returns the page location.
    fn location(&self) -> Arc<dyn BrowserLocation>;

    /// Returns the parent frame handle.
    fn parent_frame(&self) -> Arc<dyn ParentFrame>;
}
