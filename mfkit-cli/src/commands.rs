//! Command implementations. Each returns the JSON document printed by `main`.

use eyre::Result;
use mfkit_core::auth::CredentialOutcome;
use mfkit_core::config::{DefaultConfig as _, DeploymentConfig};
use mfkit_core::platform::memory::{MemoryPlatform, MemorySharedStore};
use mfkit_core::platform::SharedStore;
use mfkit_core::routes::AppRouteConfig;
use mfkit_core::{ChildApp, Environment, Scope, SyncConfig};
use serde_json::{json, Value};

/// Storage marker of the simulated shell store.
const SHELL_STORE: &str = "mf-shell-store";

/// Settings shared by every command.
pub struct Env {
    pub config: SyncConfig,
    pub embedded: bool,
}

impl Env {
    /// A browser at `href`. Standalone pages get a store the application has
    /// already initialized.
    fn platform(&self, href: &str) -> MemoryPlatform {
        if self.embedded {
            MemoryPlatform::embedded(href, SHELL_STORE)
        } else {
            MemoryPlatform {
                store: MemorySharedStore::initialized(&self.config.standalone_storage_key),
                ..MemoryPlatform::new(href)
            }
        }
    }

    fn app(&self, platform: &MemoryPlatform) -> ChildApp {
        ChildApp::with_config(platform, self.config.clone())
    }
}

/// Parses a `KEY=JSON` seed. Values that are not JSON are taken as strings.
pub fn parse_seed(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=JSON, got {raw:?}"))?;
    if key.is_empty() {
        return Err("seed key must not be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn snapshot(store: &MemorySharedStore) -> Value {
    store
        .keys()
        .into_iter()
        .map(|key| {
            let value = store.value(&key).unwrap_or(Value::Null);
            (key, value)
        })
        .collect::<serde_json::Map<_, _>>()
        .into()
}

pub fn resolve(env: &Env, scope: Scope) -> Value {
    let platform = env.platform("http://localhost:3003/");
    let app = env.app(&platform);
    let keys = app.scoped_store().resolver().resolve(scope);
    json!({
        "mode": app.mode(),
        "scope": scope,
        "keys": keys,
    })
}

pub fn migrate(env: &Env, seeds: &[(String, Value)]) -> Value {
    let platform = env.platform("http://localhost:3003/");
    for (key, value) in seeds {
        platform.store.seed(key, value);
    }
    let app = env.app(&platform);

    let report = app.scoped_store().ensure_migrated();
    tracing::info!(
        migrated = report.migrated.len(),
        failed = report.failed.len(),
        "migration pass finished"
    );

    let migrated: Vec<Value> = report
        .migrated
        .iter()
        .map(|(scope, source)| json!({"scope": scope, "from": source}))
        .collect();
    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|(scope, error)| json!({"scope": scope, "error": error}))
        .collect();
    json!({
        "mode": app.mode(),
        "migrated": migrated,
        "failed": failed,
        "store": snapshot(&platform.store),
    })
}

pub async fn handshake(env: &Env, url: &str) -> Result<Value> {
    let platform = env.platform(url);
    let app = env.app(&platform);
    let mode = app.bootstrap()?;
    tracing::info!(%mode, "runtime bootstrapped");

    let outcome = app.run_handshake().await;
    let credential = match outcome.credential {
        CredentialOutcome::NoCredential => json!({"present": false}),
        CredentialOutcome::Persisted {
            identity,
            verification,
        } => json!({
            "present": true,
            "identity": identity,
            "verification": verification,
        }),
    };
    Ok(json!({
        "mode": mode,
        "credential": credential,
        "url_stripped": outcome.url_stripped,
        "location": platform.location.current(),
        "store": snapshot(&platform.store),
    }))
}

pub async fn gate(env: &Env, token: Option<&str>, url: &str) -> Result<Value> {
    let platform = env.platform(url);
    if let Some(token) = token {
        platform
            .store
            .set(Scope::Token.to_string(), Value::String(token.to_string()).to_string())?;
    }
    let app = env.app(&platform);

    let report = app.authorize().await;
    tracing::info!(attempts = report.attempts, "gate finished");
    Ok(json!({
        "state": report.state,
        "attempts": report.attempts,
        "navigations": platform.location.navigations(),
    }))
}

pub fn routes(env: &Env, environment: Option<Environment>) -> Value {
    let environment = environment.unwrap_or(env.config.environment);
    let config = AppRouteConfig::for_environment(
        &env.config.module_name,
        &env.config.display_name,
        environment,
    );
    json!({
        "deployment": DeploymentConfig::from_environment(environment),
        "routes": config,
    })
}
