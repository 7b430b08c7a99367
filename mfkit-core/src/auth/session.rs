//! Tab-scoped authentication records.
//!
//! These predate the shared store and are still read by the authorization
//! gate as a fallback channel. Every helper logs and swallows storage
//! failures; sandboxed frames routinely deny `sessionStorage`.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::error::MfKitError;
use crate::platform::{BrowserLocation, PlatformResult, SessionStorage};

/// Session key of the credential.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Session key of the cached user profile.
pub const USER_DATA_KEY: &str = "user_data";
/// Session key of the cached permission map.
pub const PERMISSIONS_DATA_KEY: &str = "permissions_data";

/// Builds the shell's login URL, returning to `return_url` after sign-in.
///
/// # Errors
///
/// Returns [`MfKitError::InvalidUrl`] if `shell_url` is not an absolute URL.
pub fn login_url(shell_url: &str, return_url: &str) -> Result<String, MfKitError> {
    let mut url = Url::parse(&format!("{}/login", shell_url.trim_end_matches('/')))?;
    url.query_pairs_mut().append_pair("returnUrl", return_url);
    Ok(url.into())
}

/// Session-scoped token, user and permission records.
pub struct SessionAuth {
    storage: Arc<dyn SessionStorage>,
}

impl SessionAuth {
    /// Wraps the page's session storage.
    #[must_use]
    pub const fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// The stored credential, surfacing storage errors.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the read is denied.
    pub fn try_token(&self) -> PlatformResult<Option<String>> {
        Ok(self
            .storage
            .get_item(AUTH_TOKEN_KEY.to_string())?
            .filter(|token| !token.is_empty()))
    }

    /// The stored credential.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.try_token()
            .inspect_err(|err| log::warn!("failed to read session token: {err}"))
            .ok()
            .flatten()
    }

    /// Stores the credential. Returns whether the write succeeded.
    #[must_use]
    pub fn set_token(&self, token: &str) -> bool {
        self.set_item(AUTH_TOKEN_KEY, token.to_string())
    }

    /// Removes the credential and the cached user and permission records.
    pub fn remove(&self) {
        for key in [AUTH_TOKEN_KEY, USER_DATA_KEY, PERMISSIONS_DATA_KEY] {
            if let Err(err) = self.storage.remove_item(key.to_string()) {
                log::warn!("failed to remove session item {key}: {err}");
            }
        }
    }

    /// Whether a credential is stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// The cached user profile.
    #[must_use]
    pub fn user_data(&self) -> Option<Value> {
        self.json_item(USER_DATA_KEY)
    }

    /// Caches the user profile.
    #[must_use]
    pub fn set_user_data(&self, user: &Value) -> bool {
        self.set_item(USER_DATA_KEY, user.to_string())
    }

    /// The cached permission map.
    #[must_use]
    pub fn permissions(&self) -> Option<Value> {
        self.json_item(PERMISSIONS_DATA_KEY)
    }

    /// Caches the permission map.
    #[must_use]
    pub fn set_permissions(&self, permissions: &Value) -> bool {
        self.set_item(PERMISSIONS_DATA_KEY, permissions.to_string())
    }

    /// Clears the session records and sends the page to the shell's login
    /// page, returning to the current URL afterwards.
    pub fn logout(&self, location: &dyn BrowserLocation, shell_url: &str) {
        self.remove();
        let return_url = location.href().unwrap_or_default();
        match login_url(shell_url, &return_url) {
            Ok(target) => {
                if let Err(err) = location.assign(target) {
                    log::error!("failed to navigate to login: {err}");
                }
            }
            Err(err) => log::error!("cannot build login url from {shell_url}: {err}"),
        }
    }

    fn set_item(&self, key: &str, value: String) -> bool {
        match self.storage.set_item(key.to_string(), value) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to write session item {key}: {err}");
                false
            }
        }
    }

    fn json_item(&self, key: &str) -> Option<Value> {
        let raw = self
            .storage
            .get_item(key.to_string())
            .inspect_err(|err| log::warn!("failed to read session item {key}: {err}"))
            .ok()??;
        serde_json::from_str(&raw)
            .inspect_err(|err| log::warn!("session item {key} is not JSON: {err}"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::platform::memory::{MemoryLocation, MemorySessionStorage};

    fn session() -> (Arc<MemorySessionStorage>, SessionAuth) {
        let storage = Arc::new(MemorySessionStorage::new());
        (Arc::clone(&storage), SessionAuth::new(storage))
    }

    #[test]
    fn test_token_lifecycle() {
        let (_, auth) = session();
        assert!(!auth.is_authenticated());
        assert!(auth.set_token("tok_1"));
        assert_eq!(auth.token().as_deref(), Some("tok_1"));

        assert!(auth.set_user_data(&json!({"name": "Ada"})));
        assert!(auth.set_permissions(&json!({"template:read": true})));
        assert_eq!(auth.user_data(), Some(json!({"name": "Ada"})));

        auth.remove();
        assert!(!auth.is_authenticated());
        assert_eq!(auth.user_data(), None);
        assert_eq!(auth.permissions(), None);
    }

    #[test]
    fn test_denied_storage_is_swallowed() {
        let (storage, auth) = session();
        storage.set_denied(true);
        assert!(!auth.set_token("tok_1"));
        assert_eq!(auth.token(), None);
        assert!(auth.try_token().is_err());
        auth.remove();
    }

    #[test]
    fn test_login_url_encodes_return() {
        let url = login_url("http://localhost:3000/", "http://localhost:3003/a?b=1").expect("url");
        assert_eq!(
            url,
            "http://localhost:3000/login?returnUrl=http%3A%2F%2Flocalhost%3A3003%2Fa%3Fb%3D1"
        );
        assert!(login_url("not a url", "x").is_err());
    }

    #[test]
    fn test_logout_clears_and_navigates() {
        let (_, auth) = session();
        assert!(auth.set_token("tok_1"));
        let location = MemoryLocation::new("http://localhost:3003/settings");

        auth.logout(&location, "http://localhost:3000");

        assert!(!auth.is_authenticated());
        assert_eq!(
            location.navigations(),
            vec!["http://localhost:3000/login?returnUrl=http%3A%2F%2Flocalhost%3A3003%2Fsettings"
                .to_string()]
        );
    }
}
