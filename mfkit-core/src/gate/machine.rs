//! Pure transition function of the authorization gate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GatePolicy;

/// State of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// Still looking for a credential.
    Checking {
        /// Re-checks performed so far.
        retry_count: u32,
    },
    /// A credential was found, or the check could not be performed.
    Authenticated,
    /// Retries ran out; the page is leaving for the login page.
    Redirecting,
}

impl GateState {
    /// The state before the first check.
    pub const INITIAL: Self = Self::Checking { retry_count: 0 };

    /// Whether no further event changes the state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Checking { .. })
    }
}

impl Default for GateState {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Result of one credential probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// Some channel holds a credential.
    TokenFound,
    /// Every channel was readable and empty.
    TokenMissing,
    /// No credential was found and at least one channel could not be read.
    CheckFailed,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEffect {
    /// Show the protected content.
    Render,
    /// Probe again after the given delay.
    RetryAfter(Duration),
    /// Navigate to the login page.
    Redirect,
    /// Nothing to do.
    Stay,
}

/// Applies `event` to `state`.
///
/// A failed check counts as success: a store that cannot be read must not
/// lock the user out. Terminal states ignore every event.
#[must_use]
pub const fn transition(
    state: GateState,
    event: GateEvent,
    policy: &GatePolicy,
) -> (GateState, GateEffect) {
    let GateState::Checking { retry_count } = state else {
        return (state, GateEffect::Stay);
    };
    match event {
        GateEvent::TokenFound | GateEvent::CheckFailed => {
            (GateState::Authenticated, GateEffect::Render)
        }
        GateEvent::TokenMissing if retry_count < policy.max_retries => (
            GateState::Checking {
                retry_count: retry_count + 1,
            },
            GateEffect::RetryAfter(policy.retry_interval()),
        ),
        GateEvent::TokenMissing => (GateState::Redirecting, GateEffect::Redirect),
    }
}
