//! Tracks which current keys had their persistence strategy declared.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::platform::{PlatformResult, SharedStore};
use crate::Scope;

/// Per-process record of strategy declarations.
///
/// The shared store forgets strategies on reload, so each process declares a
/// scope's strategy once, before its first write.
#[derive(Debug, Default)]
pub struct StrategyLedger {
    declared: Mutex<HashSet<Scope>>,
}

impl StrategyLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `scope`'s strategy on `key` unless already done in this process.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the declaration is rejected; the scope is
    /// then left undeclared so the next write tries again.
    pub fn ensure_declared(
        &self,
        store: &dyn SharedStore,
        scope: Scope,
        key: &str,
    ) -> PlatformResult<()> {
        if self.is_declared(scope) {
            return Ok(());
        }
        store.configure_strategy(key.to_string(), scope.strategy())?;
        if let Ok(mut declared) = self.declared.lock() {
            declared.insert(scope);
        }
        Ok(())
    }

    /// Whether `scope` was declared in this process.
    #[must_use]
    pub fn is_declared(&self, scope: Scope) -> bool {
        self.declared
            .lock()
            .is_ok_and(|declared| declared.contains(&scope))
    }
}
