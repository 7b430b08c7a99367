use thiserror::Error;

use crate::platform::PlatformError;

/// Error outputs from `mfkit`
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum MfKitError {
    /// The supplied configuration is not valid
    #[error("invalid_config: {0}")]
    InvalidConfig(String),
    /// A URL could not be parsed or built
    #[error("invalid_url: {0}")]
    InvalidUrl(String),
    /// A value could not be encoded or decoded
    #[error("serialization_error: {0}")]
    SerializationError(String),
    /// A platform component failed
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl From<serde_json::Error> for MfKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

impl From<url::ParseError> for MfKitError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidUrl(error.to_string())
    }
}
