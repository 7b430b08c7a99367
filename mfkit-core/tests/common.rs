//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use mfkit_core::platform::memory::MemoryPlatform;
use mfkit_core::ChildApp;

/// Shell store marker used by the embedded fixtures.
pub const SHELL_STORE: &str = "mf-shell-store";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A configuration whose identity table knows user `42`.
pub fn config_with_identities() -> String {
    serde_json::json!({
        "verify_delay_ms": 100,
        "identities": [
            {
                "id": "42",
                "username": "ada",
                "name": "Ada Lovelace",
                "role": "admin",
                "permissions": ["template:read", "template:write"],
                "appConfig": {"theme": "dark", "language": "en-US"}
            },
            {
                "id": "7",
                "username": "bob",
                "name": "Bob",
                "role": "viewer",
                "permissions": ["template:read"]
            }
        ]
    })
    .to_string()
}

/// A gate with no debounce and two quick retries.
pub fn fast_gate_config() -> String {
    serde_json::json!({
        "gate": {"debounce_ms": 0, "max_retries": 2, "retry_interval_ms": 50}
    })
    .to_string()
}

pub fn app(platform: &MemoryPlatform, config_json: &str) -> ChildApp {
    ChildApp::new(Arc::new(platform.clone()), config_json).expect("valid config")
}

pub fn embedded(href: &str) -> MemoryPlatform {
    MemoryPlatform::embedded(href, SHELL_STORE)
}
