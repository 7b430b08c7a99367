//! Session bootstrap from a credential delivered in the page URL.
//!
//! The shell opens a child application with `?token=<credential>`. The
//! handshake persists the credential to both session storage and the shared
//! store, hydrates the user scopes from the identity table, removes the
//! credential from the address bar and finally reads its own write back.
//! Every step tolerates failure of the previous one; the only hard guarantee
//! is that the completion signal fires.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use tokio::sync::watch;
use url::Url;

use super::credential::{strip_credential, Credential};
use super::identity::{IdentityRecord, IdentityTable};
use super::session::SessionAuth;
use crate::platform::BrowserLocation;
use crate::store::ScopedStore;
use crate::Scope;

/// Result of reading the credential back after the verification delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Verification {
    /// The stored credential equals the one from the URL.
    Confirmed,
    /// A different credential is stored.
    Mismatch,
    /// No credential could be read back.
    Missing,
}

/// What happened to the URL credential.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum CredentialOutcome {
    /// The URL carried no credential.
    NoCredential,
    /// The credential was written to storage.
    Persisted {
        /// Id of the matched identity record, if any.
        identity: Option<String>,
        /// Read-back result.
        verification: Verification,
    },
}

/// Summary of one handshake run.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct HandshakeOutcome {
    /// Credential handling.
    pub credential: CredentialOutcome,
    /// Whether a credential parameter was removed from the address bar.
    pub url_stripped: bool,
}

impl HandshakeOutcome {
    const fn no_credential(url_stripped: bool) -> Self {
        Self {
            credential: CredentialOutcome::NoCredential,
            url_stripped,
        }
    }
}

/// Fires the completion signal when dropped, so a cancelled run still
/// releases anyone waiting on it.
struct CompleteOnDrop<'a>(&'a watch::Sender<bool>);

impl Drop for CompleteOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

/// Runs the URL credential handshake.
pub struct Handshake {
    store: Arc<ScopedStore>,
    session: Arc<SessionAuth>,
    location: Arc<dyn BrowserLocation>,
    identities: IdentityTable,
    verify_delay: Duration,
    completed: watch::Sender<bool>,
}

impl Handshake {
    /// Creates a handshake that has not run yet.
    #[must_use]
    pub fn new(
        store: Arc<ScopedStore>,
        session: Arc<SessionAuth>,
        location: Arc<dyn BrowserLocation>,
        identities: IdentityTable,
        verify_delay: Duration,
    ) -> Self {
        let (completed, _) = watch::channel(false);
        Self {
            store,
            session,
            location,
            identities,
            verify_delay,
            completed,
        }
    }

    /// A receiver that turns `true` once the handshake finished.
    #[must_use]
    pub fn completion(&self) -> watch::Receiver<bool> {
        self.completed.subscribe()
    }

    /// Whether the handshake finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        *self.completed.borrow()
    }

    /// Processes the credential in the current URL, if any.
    pub async fn run(&self) -> HandshakeOutcome {
        let _complete = CompleteOnDrop(&self.completed);

        let url = match self.location.href().map(|href| Url::parse(&href)) {
            Ok(Ok(url)) => url,
            Ok(Err(err)) => {
                log::warn!("current location is not a valid URL: {err}");
                return HandshakeOutcome::no_credential(false);
            }
            Err(err) => {
                log::warn!("failed to read current location: {err}");
                return HandshakeOutcome::no_credential(false);
            }
        };

        let Some(credential) = Credential::from_url(&url) else {
            log::debug!("no credential in URL");
            return HandshakeOutcome::no_credential(self.strip(&url));
        };

        self.persist(&credential);
        let identity = self.identities.find_for_credential(&credential);
        match identity {
            Some(record) => self.hydrate(record),
            None => log::info!("credential matches no known identity, leaving user scopes as is"),
        }
        let url_stripped = self.strip(&url);

        tokio::time::sleep(self.verify_delay).await;
        let verification = self.verify(&credential);
        match verification {
            Verification::Confirmed => log::info!("credential persisted and verified"),
            other => log::warn!("credential verification failed: {other}"),
        }

        HandshakeOutcome {
            credential: CredentialOutcome::Persisted {
                identity: identity.map(|record| record.id.clone()),
                verification,
            },
            url_stripped,
        }
    }

    fn persist(&self, credential: &Credential) {
        if !self.session.set_token(credential.expose()) {
            log::debug!("credential not kept in session storage");
        }
        if let Err(err) = self
            .store
            .set(Scope::Token, &Value::String(credential.expose().to_string()))
        {
            log::warn!("failed to write credential to the shared store: {err}");
        }
    }

    fn hydrate(&self, record: &IdentityRecord) {
        log::info!("credential matches identity {}", record.id);
        let mut writes = vec![(Scope::User, record.user_profile())];
        if !record.app_config.is_null() {
            writes.push((Scope::App, record.app_config.clone()));
        }
        writes.push((Scope::Permissions, record.permission_map()));

        for (scope, value) in writes {
            if let Err(err) = self.store.set(scope, &value) {
                log::warn!("failed to hydrate scope {scope}: {err}");
            }
        }
    }

    fn strip(&self, url: &Url) -> bool {
        let Some(stripped) = strip_credential(url) else {
            return false;
        };
        match self.location.replace_state(stripped.into()) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to remove credential from the URL: {err}");
                false
            }
        }
    }

    fn verify(&self, credential: &Credential) -> Verification {
        let stored = match self.store.read_current(Scope::Token) {
            Ok(Some(Value::String(token))) => Some(token),
            Ok(_) => None,
            Err(err) => {
                log::debug!("shared store read-back failed: {err}");
                None
            }
        };
        match stored.or_else(|| self.session.token()) {
            Some(token) if credential.matches(&token) => Verification::Confirmed,
            Some(_) => Verification::Mismatch,
            None => Verification::Missing,
        }
    }
}
