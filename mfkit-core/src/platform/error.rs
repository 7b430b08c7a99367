//! Error types for platform collaborators.

use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors raised by the host-provided platform components.
#[derive(Debug, Error, uniffi::Error)]
pub enum PlatformError {
    /// The shared store module is not loaded or not initialized.
    #[error("shared store unavailable: {0}")]
    Unavailable(String),

    /// Errors coming from the shared store.
    #[error("shared store error: {0}")]
    Store(String),

    /// Errors coming from session-scoped storage.
    #[error("session storage error: {0}")]
    Session(String),

    /// Errors coming from the browser location / history.
    #[error("location error: {0}")]
    Location(String),

    /// Errors posting to the parent frame.
    #[error("frame error: {0}")]
    Frame(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for PlatformError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
