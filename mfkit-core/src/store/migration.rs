//! One-shot copy of legacy scope values into the current keys.

use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value;

use super::namespace::KeyResolver;
use super::strategy::StrategyLedger;
use super::{decode_value, encode_value};
use crate::platform::PlatformResult;
use crate::Scope;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

/// Whether the migration pass already ran for an engine.
///
/// Owned by the [`MigrationEngine`] rather than held in a global so tests and
/// hosts can start over with [`MigrationState::reset`].
#[derive(Debug, Default)]
pub struct MigrationState {
    phase: AtomicU8,
}

impl MigrationState {
    /// A state that has not migrated yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(PENDING),
        }
    }

    /// Whether the pass completed.
    #[must_use]
    pub fn is_migrated(&self) -> bool {
        self.phase.load(Ordering::SeqCst) == DONE
    }

    /// Forgets a completed pass.
    pub fn reset(&self) {
        self.phase.store(PENDING, Ordering::SeqCst);
    }

    /// Claims the pass. `false` when it already ran or is running.
    fn begin(&self) -> bool {
        self.phase
            .compare_exchange(PENDING, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn finish(&self) {
        self.phase.store(DONE, Ordering::SeqCst);
    }
}

/// Outcome of a single [`MigrationEngine::ensure_migrated`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// `false` when the pass was skipped because it already ran.
    pub ran: bool,
    /// Scopes copied, with the legacy key each value came from.
    pub migrated: Vec<(Scope, String)>,
    /// Scopes whose migration failed, with the reason.
    pub failed: Vec<(Scope, String)>,
}

/// Copies the first non-empty legacy value into each empty current key.
#[derive(Debug, Default)]
pub struct MigrationEngine {
    state: MigrationState,
}

impl MigrationEngine {
    /// Creates an engine that has not run yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: MigrationState::new(),
        }
    }

    /// The engine's state.
    #[must_use]
    pub const fn state(&self) -> &MigrationState {
        &self.state
    }

    /// Runs the migration pass once; later calls return immediately.
    ///
    /// A call made while the pass is running (e.g. from a store listener fired
    /// by one of the pass's own writes) also returns immediately. Failures of
    /// individual scopes are logged and do not stop the others, and the pass
    /// is marked complete regardless.
    #[must_use]
    pub fn ensure_migrated(&self, resolver: &KeyResolver, ledger: &StrategyLedger) -> MigrationReport {
        if !self.state.begin() {
            return MigrationReport::default();
        }

        let mut report = MigrationReport {
            ran: true,
            ..MigrationReport::default()
        };
        for scope in Scope::ALL {
            match migrate_scope(resolver, ledger, scope) {
                Ok(Some(source)) => {
                    log::info!("migrated scope {scope} from {source}");
                    report.migrated.push((scope, source));
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("migration of scope {scope} failed: {err}");
                    report.failed.push((scope, err.to_string()));
                }
            }
        }

        self.state.finish();
        report
    }
}

fn migrate_scope(
    resolver: &KeyResolver,
    ledger: &StrategyLedger,
    scope: Scope,
) -> PlatformResult<Option<String>> {
    let store = resolver.store();
    let keys = resolver.resolve(scope);
    if decode_value(store.get(keys.current.clone())?).is_some() {
        return Ok(None);
    }

    let Some((source, value)) = first_legacy_value(resolver, &keys.legacy) else {
        return Ok(None);
    };

    if let Err(err) = ledger.ensure_declared(store.as_ref(), scope, &keys.current) {
        log::warn!("strategy for {} not declared, migrating anyway: {err}", keys.current);
    }
    store.set(keys.current, encode_value(&value)?)?;
    Ok(Some(source))
}

fn first_legacy_value(resolver: &KeyResolver, legacy: &[String]) -> Option<(String, Value)> {
    legacy.iter().find_map(|key| {
        match resolver.store().get(key.clone()) {
            Ok(raw) => decode_value(raw).map(|value| (key.clone(), value)),
            Err(err) => {
                log::debug!("legacy key {key} unreadable: {err}");
                None
            }
        }
    })
}
