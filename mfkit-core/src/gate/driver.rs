//! Timer-driven execution of the gate state machine.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::machine::{transition, GateEffect, GateState};
use super::probe::CredentialProbe;
use crate::auth::login_url;
use crate::config::GatePolicy;
use crate::platform::BrowserLocation;

/// Final state of a gate run and how many probes it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct GateReport {
    /// Terminal state reached.
    pub state: GateState,
    /// Number of probes performed.
    pub attempts: u32,
}

/// Decides whether protected content may render.
///
/// A run waits for the handshake (when wired), waits out the debounce, then
/// probes for a credential until one is found or retries run out. Dropping
/// the [`AuthorizationGate::run`] future cancels every pending timer.
pub struct AuthorizationGate {
    probe: Arc<dyn CredentialProbe>,
    policy: GatePolicy,
    location: Arc<dyn BrowserLocation>,
    shell_url: String,
    handshake: Option<watch::Receiver<bool>>,
    state: watch::Sender<GateState>,
}

impl AuthorizationGate {
    /// Creates a gate redirecting to `shell_url`'s login page on failure.
    #[must_use]
    pub fn new(
        probe: Arc<dyn CredentialProbe>,
        policy: GatePolicy,
        location: Arc<dyn BrowserLocation>,
        shell_url: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(GateState::INITIAL);
        Self {
            probe,
            policy,
            location,
            shell_url: shell_url.into(),
            handshake: None,
            state,
        }
    }

    /// Makes runs wait until `completion` turns `true`.
    #[must_use]
    pub fn after_handshake(mut self, completion: watch::Receiver<bool>) -> Self {
        self.handshake = Some(completion);
        self
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// A receiver following every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    /// Runs one authorization check to a terminal state.
    ///
    /// A gate that already reached a terminal state keeps it: the call
    /// returns immediately with zero attempts.
    pub async fn run(&self) -> GateReport {
        let settled = self.state();
        if settled.is_terminal() {
            log::debug!("gate already settled as {settled:?}");
            return GateReport {
                state: settled,
                attempts: 0,
            };
        }

        let mut state = GateState::INITIAL;
        self.state.send_replace(state);

        if let Some(completion) = &self.handshake {
            let mut completion = completion.clone();
            let signalled = completion.wait_for(|done| *done).await.is_ok();
            if !signalled {
                log::debug!("handshake signal dropped, checking anyway");
            }
        }
        if !self.policy.debounce().is_zero() {
            tokio::time::sleep(self.policy.debounce()).await;
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = self.probe.probe();
            let (next, effect) = transition(state, result.event(), &self.policy);
            state = next;
            self.state.send_replace(state);

            match effect {
                GateEffect::RetryAfter(delay) => {
                    log::debug!("no credential yet ({state:?}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                GateEffect::Render => {
                    log::info!("authorized after {attempts} check(s): {result:?}");
                    break;
                }
                GateEffect::Redirect => {
                    log::warn!("no credential after {attempts} check(s), redirecting to login");
                    self.redirect();
                    break;
                }
                GateEffect::Stay => break,
            }
        }

        GateReport { state, attempts }
    }

    /// Runs the gate on the tokio runtime.
    #[must_use]
    pub fn spawn(self: Arc<Self>) -> GateHandle {
        let state = self.watch_state();
        let task = tokio::spawn(async move { self.run().await });
        GateHandle {
            state,
            task: Some(task),
        }
    }

    fn redirect(&self) {
        let return_url = self.location.href().unwrap_or_default();
        let target = match login_url(&self.shell_url, &return_url) {
            Ok(target) => target,
            Err(err) => {
                log::error!("cannot build login url from {}: {err}", self.shell_url);
                return;
            }
        };
        if let Err(err) = self.location.assign(target) {
            log::error!("failed to navigate to login: {err}");
        }
    }
}

/// A spawned gate run. Dropping the handle cancels the run.
pub struct GateHandle {
    state: watch::Receiver<GateState>,
    task: Option<JoinHandle<GateReport>>,
}

impl GateHandle {
    /// The latest state.
    #[must_use]
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// A receiver following every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<GateState> {
        self.state.clone()
    }

    /// Waits for the run to finish. `None` if it was cancelled or already
    /// awaited.
    pub async fn report(&mut self) -> Option<GateReport> {
        self.task.take()?.await.ok()
    }

    /// Cancels the run.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
