//! One logical subscription spanning a scope's current and legacy keys.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::decode_value;
use crate::platform::{StoreListener, StoreSubscription};
use crate::Scope;

/// Combined disposer for every physical registration of one scope.
///
/// Notifications may arrive from any of the scope's keys in any order; treat
/// them as "the scope may have changed" and re-read through
/// [`super::ScopedStore::get`]. Dropping the handle unsubscribes.
#[derive(uniffi::Object)]
pub struct ScopeSubscription {
    scope: Scope,
    registrations: Mutex<Vec<(String, Arc<dyn StoreSubscription>)>>,
}

impl fmt::Debug for ScopeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeSubscription")
            .field("scope", &self.scope)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ScopeSubscription {
    pub(crate) const fn new(
        scope: Scope,
        registrations: Vec<(String, Arc<dyn StoreSubscription>)>,
    ) -> Self {
        Self {
            scope,
            registrations: Mutex::new(registrations),
        }
    }

    /// Keys this subscription is registered on.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.registrations
            .lock()
            .map(|registrations| registrations.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }
}

#[uniffi::export]
impl ScopeSubscription {
    /// The subscribed scope.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Whether any registration is still live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registrations
            .lock()
            .is_ok_and(|registrations| !registrations.is_empty())
    }

    /// Disposes every registration. A failing disposal is logged and does not
    /// prevent the others. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        let registrations = match self.registrations.lock() {
            Ok(mut registrations) => std::mem::take(&mut *registrations),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for (key, registration) in registrations {
            if let Err(err) = registration.dispose() {
                log::warn!("failed to dispose subscription on {key}: {err}");
            }
        }
    }
}

impl Drop for ScopeSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// A change notification delivered to a [`FnListener`] callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChange {
    /// Scope the callback was registered for.
    pub scope: Scope,
    /// Physical key that changed.
    pub key: String,
    /// Decoded new value, `None` when cleared.
    pub new_value: Option<Value>,
}

/// Adapts a closure into a [`StoreListener`] bound to one scope.
pub struct FnListener<F> {
    scope: Scope,
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(ScopeChange) + Send + Sync + 'static,
{
    /// Wraps `callback` for `scope`.
    #[must_use]
    pub const fn new(scope: Scope, callback: F) -> Self {
        Self { scope, callback }
    }
}

impl<F> StoreListener for FnListener<F>
where
    F: Fn(ScopeChange) + Send + Sync + 'static,
{
    fn on_change(&self, key: String, new_value: Option<String>, _old_value: Option<String>) {
        (self.callback)(ScopeChange {
            scope: self.scope,
            key,
            new_value: decode_value(new_value),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::platform::{PlatformError, PlatformResult};

    struct Registration {
        disposed: Arc<AtomicUsize>,
        fail: bool,
    }

    impl StoreSubscription for Registration {
        fn dispose(&self) -> PlatformResult<()> {
            self.disposed.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PlatformError::Store("teardown threw".to_string()));
            }
            Ok(())
        }
    }

    fn registration(disposed: &Arc<AtomicUsize>, fail: bool) -> Arc<dyn StoreSubscription> {
        Arc::new(Registration {
            disposed: Arc::clone(disposed),
            fail,
        })
    }

    #[test]
    fn test_failing_disposal_does_not_stop_the_rest() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let subscription = ScopeSubscription::new(
            Scope::User,
            vec![
                ("user".to_string(), registration(&disposed, true)),
                ("mf-template-userinfo".to_string(), registration(&disposed, false)),
                ("g:sh:user".to_string(), registration(&disposed, false)),
            ],
        );

        subscription.unsubscribe();

        assert_eq!(disposed.load(Ordering::SeqCst), 3);
        assert!(!subscription.is_active());
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_runs_on_drop() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let subscription = ScopeSubscription::new(
            Scope::Token,
            vec![("token".to_string(), registration(&disposed, false))],
        );
        subscription.unsubscribe();
        subscription.unsubscribe();
        drop(subscription);
        assert_eq!(disposed.load(Ordering::SeqCst), 1);

        let dropped = ScopeSubscription::new(
            Scope::Token,
            vec![("token".to_string(), registration(&disposed, false))],
        );
        drop(dropped);
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fn_listener_decodes_values() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = FnListener::new(Scope::App, move |change: ScopeChange| {
            sink.lock().expect("lock").push(change);
        });

        listener.on_change("app".to_string(), Some(r#"{"theme":"dark"}"#.to_string()), None);
        listener.on_change("g:sh:app".to_string(), None, None);

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].new_value, Some(serde_json::json!({"theme": "dark"})));
        assert_eq!(seen[1].key, "g:sh:app");
        assert_eq!(seen[1].new_value, None);
    }
}
