//! The child application runtime exposed to hosts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::{Handshake, HandshakeOutcome, IdentityTable, Permissions, SessionAuth};
use crate::config::{DeploymentConfig, SyncConfig};
use crate::error::MfKitError;
use crate::frame::{FrameChannel, FrameMessage};
use crate::gate::{AuthorizationGate, GateHandle, GateReport, TokenProbe};
use crate::platform::{
    BrowserLocation, PlatformProvider, SharedStore, StoreInitOptions, StoreListener,
};
use crate::routes::AppRouteConfig;
use crate::store::{RuntimeMode, ScopeSubscription, ScopedStore};
use crate::Scope;

fn default_app_config() -> Value {
    json!({
        "theme": "light",
        "language": "zh-CN",
        "version": "1.0.0-standalone",
    })
}

/// A micro-frontend child application wired to its platform.
///
/// Typical start-up: [`ChildApp::bootstrap`], then
/// [`ChildApp::run_handshake`], then [`ChildApp::authorize`] before rendering
/// protected content.
#[derive(uniffi::Object)]
pub struct ChildApp {
    config: SyncConfig,
    shared: Arc<dyn SharedStore>,
    store: Arc<ScopedStore>,
    session: Arc<SessionAuth>,
    location: Arc<dyn BrowserLocation>,
    handshake: Handshake,
    handshake_started: AtomicBool,
    frame: FrameChannel,
}

impl ChildApp {
    /// Builds the runtime from an already parsed configuration.
    #[must_use]
    pub fn with_config(provider: &dyn PlatformProvider, config: SyncConfig) -> Self {
        let shared = provider.shared_store();
        let store = Arc::new(ScopedStore::from_config(Arc::clone(&shared), &config));
        let session = Arc::new(SessionAuth::new(provider.session_storage()));
        let location = provider.location();
        let handshake = Handshake::new(
            Arc::clone(&store),
            Arc::clone(&session),
            Arc::clone(&location),
            IdentityTable::new(config.identities.clone()),
            config.verify_delay(),
        );
        let frame = FrameChannel::new(provider.parent_frame(), config.source.clone());

        Self {
            config,
            shared,
            store,
            session,
            location,
            handshake,
            handshake_started: AtomicBool::new(false),
            frame,
        }
    }

    /// The scoped store.
    #[must_use]
    pub const fn scoped_store(&self) -> &Arc<ScopedStore> {
        &self.store
    }

    /// Session-scoped authentication records.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionAuth> {
        &self.session
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Builds an authorization gate. When the handshake has been started, the
    /// gate waits for it to finish before its first check.
    #[must_use]
    pub fn gate(&self) -> AuthorizationGate {
        let probe = Arc::new(TokenProbe::new(
            Arc::clone(&self.store),
            Arc::clone(&self.session),
        ));
        let gate = AuthorizationGate::new(
            probe,
            self.config.gate,
            Arc::clone(&self.location),
            self.config.deployment().shell_url,
        );
        if self.handshake_started.load(Ordering::SeqCst) {
            gate.after_handshake(self.handshake.completion())
        } else {
            gate
        }
    }

    /// Runs an authorization check in the background.
    #[must_use]
    pub fn spawn_authorization(&self) -> GateHandle {
        Arc::new(self.gate()).spawn()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl ChildApp {
    /// Creates the runtime from the host's platform components and a JSON
    /// [`SyncConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`MfKitError::InvalidConfig`] if the configuration is invalid.
    #[uniffi::constructor]
    pub fn new(provider: Arc<dyn PlatformProvider>, config_json: &str) -> Result<Self, MfKitError> {
        let config = SyncConfig::from_json(config_json)?;
        Ok(Self::with_config(provider.as_ref(), config))
    }

    /// Initializes the shared store when no shell provided one, then seeds a
    /// default application config when running standalone with none stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized or seeded.
    pub fn bootstrap(&self) -> Result<RuntimeMode, MfKitError> {
        if self.shared.is_initialized() {
            log::info!("using the shared store provided by the shell");
        } else {
            log::info!("no shell store found, initializing one for standalone mode");
            self.shared.init(StoreInitOptions {
                enable_persistence: true,
                enable_encryption: true,
                storage_key: self.config.standalone_storage_key.clone(),
            })?;
        }

        let mode = self.store.resolver().mode();
        if mode == RuntimeMode::Standalone && self.store.get(Scope::App).is_none() {
            self.store.set(Scope::App, &default_app_config())?;
        }
        Ok(mode)
    }

    /// The runtime mode.
    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.store.resolver().mode()
    }

    /// Deployment locations for the configured environment.
    #[must_use]
    pub fn deployment(&self) -> DeploymentConfig {
        self.config.deployment()
    }

    /// Processes the credential in the current URL.
    pub async fn run_handshake(&self) -> HandshakeOutcome {
        self.handshake_started.store(true, Ordering::SeqCst);
        self.handshake.run().await
    }

    /// Runs one authorization check, redirecting to login on failure.
    pub async fn authorize(&self) -> GateReport {
        self.gate().run().await
    }

    /// Reads a scope as JSON text.
    #[must_use]
    pub fn get_scope(&self, scope: Scope) -> Option<String> {
        self.store.get(scope).map(|value| value.to_string())
    }

    /// Writes JSON text to a scope.
    ///
    /// # Errors
    ///
    /// Returns an error if `value_json` is not JSON or the write fails.
    pub fn set_scope(&self, scope: Scope, value_json: &str) -> Result<(), MfKitError> {
        let value: Value = serde_json::from_str(value_json)?;
        self.store.set(scope, &value)?;
        Ok(())
    }

    /// Subscribes `listener` to every key of `scope`.
    #[must_use]
    pub fn subscribe_scope(
        &self,
        scope: Scope,
        listener: Arc<dyn StoreListener>,
    ) -> Arc<ScopeSubscription> {
        Arc::new(self.store.subscribe(scope, listener))
    }

    /// Whether `permission` is explicitly granted.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        Permissions::load(&self.store).has_permission(permission)
    }

    /// Whether the user holds any of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: Vec<String>) -> bool {
        Permissions::load(&self.store).has_any_role(roles.as_slice())
    }

    /// The route table for the configured environment.
    #[must_use]
    pub fn route_config(&self) -> AppRouteConfig {
        AppRouteConfig::for_environment(
            &self.config.module_name,
            &self.config.display_name,
            self.config.environment,
        )
    }

    /// Asks the shell to scroll to the top.
    #[must_use]
    pub fn scroll_to_top(&self, smooth: bool) -> bool {
        self.frame.scroll_to_top(smooth)
    }

    /// Announces the route table to the shell.
    #[must_use]
    pub fn announce_routes(&self) -> bool {
        self.frame.announce_routes(&self.route_config())
    }

    /// Parses a message received from the shell.
    #[must_use]
    pub fn handle_frame_message(&self, json: &str) -> Option<FrameMessage> {
        self.frame.handle_incoming(json)
    }

    /// Signs out: clears session records (and the standalone store's data),
    /// then navigates to the shell's login page.
    pub fn logout(&self) {
        if self.mode() == RuntimeMode::Standalone {
            if let Err(err) = self
                .store
                .clear_app_data(&self.config.standalone_storage_key)
            {
                log::warn!("failed to clear standalone store data: {err}");
            }
        }
        self.session
            .logout(self.location.as_ref(), &self.config.deployment().shell_url);
    }
}
