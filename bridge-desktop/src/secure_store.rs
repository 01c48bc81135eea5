//! Session token storage in the OS credential store.
//!
//! Backed by Keychain on macOS, Credential Manager on Windows and the Secret
//! Service on Linux. Values are base64-encoded because keyring entries hold
//! strings only.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::{debug, warn};

const DEFAULT_SERVICE_NAME: &str = "podify-client";

pub struct KeyringSecureStore {
    service: String,
}

impl KeyringSecureStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE_NAME)
    }

    /// Separate service names keep test or staging tokens apart from the real one.
    pub fn with_service_name(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(keyring_error)
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn keyring_error(e: keyring::Error) -> BridgeError {
    BridgeError::OperationFailed(format!("Keyring error: {}", e))
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entry(key)?
            .set_password(&STANDARD.encode(value))
            .map_err(keyring_error)?;
        debug!(key, "Secret stored");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let encoded = match self.entry(key)?.get_password() {
            Ok(encoded) => encoded,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(keyring_error(e)),
        };
        STANDARD.decode(encoded).map(Some).map_err(|e| {
            warn!(key, error = %e, "Stored secret is not valid base64");
            BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
        })
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key, "Secret deleted");
                Ok(())
            }
            Err(e) => Err(keyring_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_service_name() {
        assert_eq!(KeyringSecureStore::new().service, "podify-client");
        assert_eq!(KeyringSecureStore::default().service, "podify-client");
    }

    #[tokio::test]
    async fn token_survives_a_round_trip_when_keyring_is_available() {
        let store = KeyringSecureStore::with_service_name("podify-client-test");
        let key = "AUTH_TOKEN_TEST";
        let _ = store.delete_secret(key).await;

        // Headless CI machines often have no secret service.
        if let Err(e) = store.set_secret(key, b"jwt-value").await {
            eprintln!("keyring unavailable: {}", e);
            return;
        }
        if let Ok(found) = store.get_secret(key).await {
            assert_eq!(found, Some(b"jwt-value".to_vec()));
        }
        store.delete_secret(key).await.unwrap();
        assert!(!store.has_secret(key).await.unwrap_or(false));
    }
}
