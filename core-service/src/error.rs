//! Service-level error taxonomy

use core_api::{ApiError, GENERIC_ERROR_MESSAGE};
use core_auth::AuthError;
use core_playback::PlaybackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Transport failure or non-2xx response, including 401/403.
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Local input rejected before any request was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The user backed out of an operation.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

impl CoreError {
    /// Silent errors are dropped without a notification.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            CoreError::Cancelled | CoreError::Playback(PlaybackError::UnsupportedRate(_))
        )
    }

    /// Text for the notification slice.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Network(e) => e.user_message(),
            CoreError::Playback(e) => e.to_string(),
            CoreError::Validation(message) => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<AuthError> for CoreError {
    fn from(error: AuthError) -> Self {
        CoreError::Network(ApiError::Auth(error))
    }
}

impl From<core_runtime::Error> for CoreError {
    fn from(error: core_runtime::Error) -> Self {
        match error {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            core_runtime::Error::Config(message) => CoreError::Configuration(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
