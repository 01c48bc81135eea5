//! Secure Storage Abstraction
//!
//! The only datum the client persists across launches is the session token,
//! so the storage surface is a single secret store keyed by name.

use async_trait::async_trait;

use crate::error::Result;

/// Platform credential store (Keychain, Keystore, Credential Manager,
/// Secret Service). Implementations must never log stored values.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, overwriting any previous value under `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}
