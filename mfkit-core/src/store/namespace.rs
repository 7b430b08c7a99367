//! Mapping from logical scopes to physical store keys.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::platform::SharedStore;
use crate::Scope;

/// Prefix of the retired mode-prefixed short-key scheme (`g:sh:<scope>`).
const SHORT_KEY_PREFIX: &str = "g:sh:";

/// Whether this process owns the shared store or runs inside the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RuntimeMode {
    /// The application initialized the store itself.
    Standalone,
    /// The shell provided the store.
    Embedded,
}

/// Physical keys backing one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct ScopeKeys {
    /// The actively written key.
    pub current: String,
    /// Read-only migration sources, highest priority first.
    pub legacy: Vec<String>,
}

impl ScopeKeys {
    /// Current key followed by every legacy key.
    #[must_use]
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.current.as_str()).chain(self.legacy.iter().map(String::as_str))
    }
}

/// Resolves scopes to [`ScopeKeys`].
///
/// The runtime mode is read from the store's storage-identity marker the first
/// time it is needed and cached for the resolver's lifetime.
pub struct KeyResolver {
    store: Arc<dyn SharedStore>,
    app_namespace: String,
    shell_namespace: String,
    standalone_storage_key: String,
    mode: OnceLock<RuntimeMode>,
}

impl KeyResolver {
    /// Creates a resolver that detects the mode lazily.
    #[must_use]
    pub fn new(
        store: Arc<dyn SharedStore>,
        app_namespace: impl Into<String>,
        shell_namespace: impl Into<String>,
        standalone_storage_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            app_namespace: app_namespace.into(),
            shell_namespace: shell_namespace.into(),
            standalone_storage_key: standalone_storage_key.into(),
            mode: OnceLock::new(),
        }
    }

    /// The runtime mode, detected on first use.
    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        *self.mode.get_or_init(|| self.detect_mode())
    }

    fn detect_mode(&self) -> RuntimeMode {
        match self.store.storage_key() {
            Ok(Some(marker)) if marker == self.standalone_storage_key => RuntimeMode::Standalone,
            Ok(Some(marker)) => {
                log::debug!("storage marker {marker:?} belongs to the shell, running embedded");
                RuntimeMode::Embedded
            }
            Ok(None) => {
                log::debug!("store exposes no storage marker, assuming standalone");
                RuntimeMode::Standalone
            }
            Err(err) => {
                log::warn!("failed to read storage marker, assuming standalone: {err}");
                RuntimeMode::Standalone
            }
        }
    }

    /// Resolves `scope`.
    ///
    /// The current key is the scope name in both modes; legacy keys are the
    /// namespaced variant of the active mode followed by the short-key scheme.
    #[must_use]
    pub fn resolve(&self, scope: Scope) -> ScopeKeys {
        let namespace = match self.mode() {
            RuntimeMode::Standalone => &self.app_namespace,
            RuntimeMode::Embedded => &self.shell_namespace,
        };
        ScopeKeys {
            current: scope.to_string(),
            legacy: vec![
                format!("{namespace}-{}", scope.legacy_suffix()),
                format!("{SHORT_KEY_PREFIX}{scope}"),
            ],
        }
    }

    /// The shared store this resolver inspects.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SharedStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::platform::memory::MemorySharedStore;

    fn resolver(store: MemorySharedStore) -> KeyResolver {
        KeyResolver::new(Arc::new(store), "mf-template", "mf-shell", "mf-template-store")
    }

    #[test_case(Scope::User, "mf-template-userinfo" ; "user")]
    #[test_case(Scope::App, "mf-template-appconfig" ; "app")]
    #[test_case(Scope::Permissions, "mf-template-permissions" ; "permissions")]
    #[test_case(Scope::Token, "mf-template-token" ; "token")]
    fn test_standalone_keys(scope: Scope, legacy: &str) {
        let resolver = resolver(MemorySharedStore::initialized("mf-template-store"));
        let keys = resolver.resolve(scope);
        assert_eq!(resolver.mode(), RuntimeMode::Standalone);
        assert_eq!(keys.current, scope.to_string());
        assert_eq!(keys.legacy[0], legacy);
        assert_eq!(keys.legacy[1], format!("g:sh:{scope}"));
    }

    #[test]
    fn test_embedded_uses_shell_namespace() {
        let resolver = resolver(MemorySharedStore::initialized("mf-shell-store"));
        let keys = resolver.resolve(Scope::App);
        assert_eq!(resolver.mode(), RuntimeMode::Embedded);
        assert_eq!(keys.current, "app");
        assert_eq!(keys.legacy, vec!["mf-shell-appconfig", "g:sh:app"]);
    }

    #[test]
    fn test_unreadable_marker_falls_back_to_standalone() {
        let store = MemorySharedStore::initialized("mf-shell-store");
        store.set_unavailable(true);
        let resolver = resolver(store);
        assert_eq!(resolver.mode(), RuntimeMode::Standalone);
    }

    #[test]
    fn test_mode_is_cached() {
        let store = MemorySharedStore::initialized("mf-shell-store");
        let resolver = resolver(store.clone());
        assert_eq!(resolver.mode(), RuntimeMode::Embedded);
        store.set_unavailable(true);
        assert_eq!(resolver.mode(), RuntimeMode::Embedded);
        assert_eq!(resolver.resolve(Scope::Token).legacy[0], "mf-shell-token");
    }

    #[test]
    fn test_all_yields_current_first() {
        let resolver = resolver(MemorySharedStore::new());
        let keys = resolver.resolve(Scope::User);
        let all: Vec<&str> = keys.all().collect();
        assert_eq!(all, vec!["user", "mf-template-userinfo", "g:sh:user"]);
    }
}
