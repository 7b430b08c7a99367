//! Value types exchanged with the shared store.

use serde::{Deserialize, Serialize};

/// Where the shared store persists a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum StorageMedium {
    /// Survives reloads (`localStorage`-like).
    Local,
    /// Cleared with the tab (`sessionStorage`-like).
    Session,
}

/// Per-key persistence strategy declared to the shared store.
///
/// The store does not remember strategies across reloads, so every process
/// must declare them again before its first write to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Record)]
pub struct StoreStrategy {
    /// Persistence medium.
    pub medium: StorageMedium,
    /// Whether the store encrypts the value at rest.
    pub encrypted: bool,
}

impl StoreStrategy {
    /// Persistent, plaintext.
    pub const PLAIN: Self = Self {
        medium: StorageMedium::Local,
        encrypted: false,
    };

    /// Persistent, encrypted at rest.
    pub const ENCRYPTED: Self = Self {
        medium: StorageMedium::Local,
        encrypted: true,
    };
}

/// Options used when this process initializes the shared store itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct StoreInitOptions {
    /// Persist values beyond the current page.
    pub enable_persistence: bool,
    /// Encrypt values configured as encrypted.
    pub enable_encryption: bool,
    /// Storage-identity marker; doubles as the standalone-mode marker.
    pub storage_key: String,
}
