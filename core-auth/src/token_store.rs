//! Session Token Storage
//!
//! The session token is the only datum the client persists. It lives in the
//! platform secure store under [`AUTH_TOKEN_KEY`] and is cleared on logout.
//!
//! ## Security
//!
//! - Token values are never logged; [`SessionToken`]'s `Debug` is redacted
//! - Unreadable (non UTF-8) entries are deleted on read
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{SessionToken, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let tokens = TokenStore::new(secure_store);
//!
//! tokens.store(&SessionToken::new("eyJhbGciOi...")).await?;
//! if let Some(token) = tokens.load().await? {
//!     // attach as `Authorization: Bearer <token>`
//!     let _ = token.as_str();
//! }
//! tokens.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use bridge_traits::storage::SecureStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure-store key holding the session token.
pub const AUTH_TOKEN_KEY: &str = "AUTH_TOKEN";

/// Bearer token issued by `/auth/sign-in`.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

/// Secure storage for the session token.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing TokenStore");
        Self { secure_store }
    }

    /// Persist the token, overwriting any previous one.
    pub async fn store(&self, token: &SessionToken) -> Result<()> {
        self.secure_store
            .set_secret(AUTH_TOKEN_KEY, token.as_str().as_bytes())
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store session token");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Session token stored");
        Ok(())
    }

    /// Read the token.
    ///
    /// Returns `Ok(None)` when signed out. An entry that is not valid UTF-8
    /// is deleted and reported as [`AuthError::TokenCorrupted`].
    pub async fn load(&self) -> Result<Option<SessionToken>> {
        let data = self
            .secure_store
            .get_secret(AUTH_TOKEN_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read session token");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(data) = data else {
            debug!("No session token in storage");
            return Ok(None);
        };

        match String::from_utf8(data) {
            Ok(token) if !token.is_empty() => Ok(Some(SessionToken(token))),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(error = %e, "Session token is corrupted, removing it");
                if let Err(delete_err) = self.secure_store.delete_secret(AUTH_TOKEN_KEY).await {
                    warn!(error = %delete_err, "Failed to delete corrupted session token");
                }
                Err(AuthError::TokenCorrupted {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Like [`TokenStore::load`] but a missing token is an error.
    pub async fn require(&self) -> Result<SessionToken> {
        self.load().await?.ok_or(AuthError::NotAuthenticated)
    }

    /// Remove the token. Succeeds when there is nothing to remove.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(AUTH_TOKEN_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete session token");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Session token cleared");
        Ok(())
    }

    pub async fn has_token(&self) -> Result<bool> {
        self.secure_store
            .has_secret(AUTH_TOKEN_KEY)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }
}
