//! Runtime configuration: deployment environment and synchronization settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::auth::IdentityRecord;
use crate::error::MfKitError;

/// Deployment environment of the child application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, uniffi::Enum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Local development servers.
    #[default]
    Development,
    /// Published build.
    Production,
}

impl Environment {
    /// Infers the environment from the page hostname, honouring an explicit
    /// override (e.g. an injected `__NODE_ENV__`) when the hostname is not a
    /// known production host.
    #[must_use]
    pub fn detect(hostname: &str, declared: Option<&str>) -> Self {
        if hostname.contains("github.io") {
            return Self::Production;
        }
        declared
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// Shell and application locations for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct DeploymentConfig {
    /// Base URL of the shell; its `/login` page handles sign-in.
    pub shell_url: String,
    /// Base URL of this child application.
    pub app_url: String,
    /// Router basename when running standalone.
    pub basename: String,
    /// Whether this is a production deployment.
    pub is_production: bool,
}

/// Builds the default [`DeploymentConfig`] for an [`Environment`].
pub trait DefaultConfig {
    /// Returns the defaults for `environment`.
    fn from_environment(environment: Environment) -> Self;
}

impl DefaultConfig for DeploymentConfig {
    fn from_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self {
                shell_url: "http://localhost:3000".to_string(),
                app_url: "http://localhost:3003".to_string(),
                basename: String::new(),
                is_production: false,
            },
            Environment::Production => Self {
                shell_url: "https://luozyiii.github.io/mf-shell".to_string(),
                app_url: "https://luozyiii.github.io/mf-template".to_string(),
                basename: "/mf-template".to_string(),
                is_production: true,
            },
        }
    }
}

/// Timing and retry bounds of the authorization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct GatePolicy {
    /// Delay before the first check, against render flicker.
    pub debounce_ms: u64,
    /// Re-checks allowed after the first one.
    pub max_retries: u32,
    /// Wait between checks.
    pub retry_interval_ms: u64,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            max_retries: 5,
            retry_interval_ms: 500,
        }
    }
}

impl GatePolicy {
    /// Debounce as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Retry interval as a [`Duration`].
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Settings of the synchronization layer, usually supplied as JSON.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Legacy key namespace of this application (`<ns>-userinfo`, ...).
    pub app_namespace: String,
    /// Legacy key namespace of the shell.
    pub shell_namespace: String,
    /// Storage-identity marker this application uses when it owns the store.
    pub standalone_storage_key: String,
    /// `source` field of cross-frame messages.
    pub source: String,
    /// Module name used for route prefixes and permissions.
    pub module_name: String,
    /// Human readable application name.
    pub display_name: String,
    /// Deployment environment.
    pub environment: Environment,
    /// Delay before the handshake reads its write back.
    pub verify_delay_ms: u64,
    /// Authorization gate bounds.
    pub gate: GatePolicy,
    /// Local identity table used to enrich a credential.
    pub identities: Vec<IdentityRecord>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            app_namespace: "mf-template".to_string(),
            shell_namespace: "mf-shell".to_string(),
            standalone_storage_key: "mf-template-store".to_string(),
            source: "template".to_string(),
            module_name: "template".to_string(),
            display_name: "Template".to_string(),
            environment: Environment::default(),
            verify_delay_ms: 100,
            gate: GatePolicy::default(),
            identities: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MfKitError::InvalidConfig`] if the JSON is malformed or a
    /// namespace is empty.
    pub fn from_json(json: &str) -> Result<Self, MfKitError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| MfKitError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), MfKitError> {
        for (field, value) in [
            ("app_namespace", &self.app_namespace),
            ("shell_namespace", &self.shell_namespace),
            ("standalone_storage_key", &self.standalone_storage_key),
        ] {
            if value.trim().is_empty() {
                return Err(MfKitError::InvalidConfig(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Handshake verification delay as a [`Duration`].
    #[must_use]
    pub const fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay_ms)
    }

    /// Deployment defaults for the configured environment.
    #[must_use]
    pub fn deployment(&self) -> DeploymentConfig {
        DeploymentConfig::from_environment(self.environment)
    }
}
