//! Error types for the remote API

use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use thiserror::Error;

/// Message shown when the server did not explain the failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response. `message` is the body's `message` field, if any.
    #[error("API error (status {status}): {}", message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE))]
    Http { status: u16, message: Option<String> },

    /// 401 or 403.
    #[error("Unauthorized (status {status})")]
    Unauthorized { status: u16, message: Option<String> },

    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Text suitable for the notification slice.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http {
                message: Some(message),
                ..
            }
            | ApiError::Unauthorized {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Unauthorized { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ApiError::Http {
            status: 422,
            message: Some("Invalid title".to_string()),
        };
        assert_eq!(err.user_message(), "Invalid title");
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        let err = ApiError::Http {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        assert_eq!(err.to_string(), "API error (status 500): Something went wrong!");

        let err = ApiError::Transport(BridgeError::OperationFailed("dns".into()));
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_unauthorized_surfaces_like_network_error() {
        let err = ApiError::Unauthorized {
            status: 401,
            message: Some("Unauthorized request!".to_string()),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), "Unauthorized request!");
    }
}
