//! Credential probes consulted by the gate.

use std::sync::Arc;

use serde_json::Value;
use strum::Display;

use super::machine::GateEvent;
use crate::auth::SessionAuth;
use crate::store::ScopedStore;
use crate::Scope;

/// Where a credential can be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenChannel {
    /// The shared store's current `token` key, read directly.
    SharedStore,
    /// The scoped accessor, including legacy fallback.
    Accessor,
    /// The session `auth_token` record.
    Session,
}

/// Result of one probe across every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// A credential was found on the given channel.
    Found(TokenChannel),
    /// Every channel was read and none holds a credential.
    Missing,
    /// Nothing was found and the listed channels could not be read.
    Failed(Vec<TokenChannel>),
}

impl ProbeResult {
    /// The gate event this result maps to.
    #[must_use]
    pub const fn event(&self) -> GateEvent {
        match self {
            Self::Found(_) => GateEvent::TokenFound,
            Self::Missing => GateEvent::TokenMissing,
            Self::Failed(_) => GateEvent::CheckFailed,
        }
    }
}

/// Source of credential probes. Implemented by [`TokenProbe`]; tests and
/// hosts may supply their own.
pub trait CredentialProbe: Send + Sync {
    /// Looks for a credential.
    fn probe(&self) -> ProbeResult;
}

/// Probes the shared store, the accessor and session storage, in that order.
pub struct TokenProbe {
    store: Arc<ScopedStore>,
    session: Arc<SessionAuth>,
}

impl TokenProbe {
    /// Creates a probe over the given channels.
    #[must_use]
    pub const fn new(store: Arc<ScopedStore>, session: Arc<SessionAuth>) -> Self {
        Self { store, session }
    }
}

impl CredentialProbe for TokenProbe {
    fn probe(&self) -> ProbeResult {
        let mut failed = Vec::new();

        match self.store.read_current(Scope::Token) {
            Ok(value) if holds_token(value.as_ref()) => {
                return ProbeResult::Found(TokenChannel::SharedStore)
            }
            Ok(_) => {}
            Err(err) => {
                log::debug!("direct token read failed: {err}");
                failed.push(TokenChannel::SharedStore);
            }
        }

        if holds_token(self.store.get(Scope::Token).as_ref()) {
            return ProbeResult::Found(TokenChannel::Accessor);
        }

        match self.session.try_token() {
            Ok(Some(_)) => return ProbeResult::Found(TokenChannel::Session),
            Ok(None) => {}
            Err(err) => {
                log::debug!("session token read failed: {err}");
                failed.push(TokenChannel::Session);
            }
        }

        if failed.is_empty() {
            ProbeResult::Missing
        } else {
            ProbeResult::Failed(failed)
        }
    }
}

fn holds_token(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(token)) => !token.trim().is_empty(),
        Some(_) => true,
    }
}
