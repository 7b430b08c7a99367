//! Credential handshake driven end to end through a [`ChildApp`].

mod common;

use mfkit_core::auth::{CredentialOutcome, Verification};
use mfkit_core::Scope;
use serde_json::{json, Value};

#[tokio::test(start_paused = true)]
async fn known_identity_is_hydrated_and_url_cleaned() {
    common::init_logging();
    let platform =
        common::embedded("http://localhost:3000/template/dashboard?tab=1&token=tok_42_abc#top");
    let app = common::app(&platform, &common::config_with_identities());
    app.bootstrap().expect("bootstrap");

    let outcome = app.run_handshake().await;

    assert_eq!(
        outcome.credential,
        CredentialOutcome::Persisted {
            identity: Some("42".to_string()),
            verification: Verification::Confirmed,
        }
    );
    assert!(outcome.url_stripped);
    assert_eq!(
        platform.location.current(),
        "http://localhost:3000/template/dashboard?tab=1#top"
    );

    assert_eq!(
        platform.store.value("token"),
        Some(Value::String("tok_42_abc".to_string()))
    );
    assert_eq!(app.session().token().as_deref(), Some("tok_42_abc"));
    assert_eq!(
        platform.store.value("user"),
        Some(json!({
            "id": "42",
            "username": "ada",
            "name": "Ada Lovelace",
            "role": "admin",
            "permissions": ["template:read", "template:write"],
        }))
    );
    assert_eq!(
        platform.store.value("app"),
        Some(json!({"theme": "dark", "language": "en-US"}))
    );
    assert!(app.has_permission("template:write"));
    assert!(app.has_any_role(vec!["admin".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn unknown_identity_only_stores_the_credential() {
    common::init_logging();
    let platform = common::embedded("http://localhost:3000/template?token=tok_999_xyz");
    platform.store.seed("user", &json!({"name": "Existing"}));
    let app = common::app(&platform, &common::config_with_identities());

    let outcome = app.run_handshake().await;

    assert_eq!(
        outcome.credential,
        CredentialOutcome::Persisted {
            identity: None,
            verification: Verification::Confirmed,
        }
    );
    assert_eq!(platform.store.value("user"), Some(json!({"name": "Existing"})));
    assert_eq!(platform.store.value("permissions"), None);
    assert_eq!(
        app.get_scope(Scope::Token).as_deref(),
        Some(r#""tok_999_xyz""#)
    );
}

#[tokio::test(start_paused = true)]
async fn identity_without_app_config_keeps_app_scope() {
    common::init_logging();
    let platform = common::embedded("http://localhost:3000/template?token=tok_7_q");
    platform.store.seed("app", &json!({"theme": "light"}));
    let app = common::app(&platform, &common::config_with_identities());

    let outcome = app.run_handshake().await;

    assert!(matches!(
        outcome.credential,
        CredentialOutcome::Persisted { identity: Some(ref id), .. } if id == "7"
    ));
    assert_eq!(platform.store.value("app"), Some(json!({"theme": "light"})));
    assert_eq!(
        platform.store.value("permissions"),
        Some(json!({"template:read": true}))
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_token_parameters_are_all_removed() {
    common::init_logging();
    let platform = common::embedded("http://localhost:3000/template?token=a&page=2&token=b");
    let app = common::app(&platform, "{}");

    let outcome = app.run_handshake().await;

    assert!(outcome.url_stripped);
    assert_eq!(platform.location.current(), "http://localhost:3000/template?page=2");
    assert_eq!(platform.store.value("token"), Some(Value::String("a".to_string())));
}

#[tokio::test(start_paused = true)]
async fn url_without_credential_changes_nothing() {
    common::init_logging();
    let platform = common::embedded("http://localhost:3000/template/settings");
    let app = common::app(&platform, &common::config_with_identities());

    let outcome = app.run_handshake().await;

    assert_eq!(outcome.credential, CredentialOutcome::NoCredential);
    assert!(!outcome.url_stripped);
    assert!(platform.location.replaced().is_empty());
    assert!(platform.store.write_log().is_empty());
    assert_eq!(app.session().token(), None);
}
