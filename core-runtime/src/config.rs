//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! that holds every host bridge and tunable the core needs. It enforces
//! fail-fast validation so a missing bridge is reported at startup rather
//! than on the first play gesture.
//!
//! ## Required Dependencies
//!
//! - `MediaEngine` - The native audio player. There is never a default.
//!
//! ## Dependencies with platform defaults
//!
//! - `HttpClient` - desktop default: `ReqwestHttpClient`
//! - `SecureStore` - desktop default: `KeyringSecureStore`
//! - `Clock` - default: `SystemClock`
//!
//! The desktop defaults are only injected when the `desktop-shims` feature is
//! enabled. Without it, a missing bridge fails with
//! [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .media_engine(Arc::new(MyEngine::new()))
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .history_debounce(Duration::from_millis(1000))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, MediaEngine, SecureStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Base URL of the hosted API.
pub const DEFAULT_API_BASE_URL: &str = "https://podify-server-2c658ffbb41f.herokuapp.com";

/// How long a notification stays visible.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_millis(3000);

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

const MAX_HISTORY_DEBOUNCE: Duration = Duration::from_secs(60);

/// Playback and telemetry tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Cadence at which the engine emits progress events.
    pub progress_update_interval: Duration,

    /// Quiet window before the latest progress record is sent to `/history`.
    pub history_debounce: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_update_interval: Duration::from_secs(10),
            history_debounce: Duration::from_millis(100),
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.progress_update_interval.is_zero() {
            return Err(Error::Config(
                "Progress update interval must be greater than 0".to_string(),
            ));
        }

        if self.history_debounce < Duration::from_millis(1) {
            return Err(Error::Config(
                "History debounce must be at least 1ms".to_string(),
            ));
        }

        if self.history_debounce > MAX_HISTORY_DEBOUNCE {
            return Err(Error::Config(
                "History debounce exceeds maximum of 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL for the remote API, without a trailing slash
    pub api_base_url: String,

    pub http_client: Arc<dyn HttpClient>,

    /// Holds the `AUTH_TOKEN` session secret
    pub secure_store: Arc<dyn SecureStore>,

    pub media_engine: Arc<dyn MediaEngine>,

    pub clock: Arc<dyn Clock>,

    pub playback: PlaybackConfig,

    pub notification_timeout: Duration,

    /// Capacity of the core event broadcast channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("media_engine", &"MediaEngine { ... }")
            .field("clock", &"Clock { ... }")
            .field("playback", &self.playback)
            .field("notification_timeout", &self.notification_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is a non-empty http(s) URL
    /// - Playback timings are in range
    /// - The notification timeout and event buffer are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }

        self.playback.validate()?;

        if self.notification_timeout.is_zero() {
            return Err(Error::Config(
                "Notification timeout must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn media_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "A MediaEngine implementation is required for playback. \
                 Inject the host's native player (AVPlayer/ExoPlayer wrapper) with .media_engine()."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for API access. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for session persistence. \
                 Desktop: enable the 'desktop-shims' feature to use the default KeyringSecureStore. \
                 Mobile: inject platform-native secure storage (Keychain/Keystore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client: Arc<dyn HttpClient> = Arc::new(bridge_desktop::ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    let store: Arc<dyn SecureStore> = Arc::new(bridge_desktop::KeyringSecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once every required bridge has
/// been set. Unset tunables take their documented defaults.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    media_engine: Option<Arc<dyn MediaEngine>>,
    clock: Option<Arc<dyn Clock>>,
    playback: PlaybackConfig,
    notification_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the API base URL. A trailing slash is stripped.
    ///
    /// Default: [`DEFAULT_API_BASE_URL`]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    ///
    /// The secure store persists the session token. It must provide
    /// platform-appropriate security (Keychain on macOS/iOS, Keystore on
    /// Android, etc.).
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the media engine (required).
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    /// Sets the time source. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the engine's progress event cadence.
    ///
    /// Default: 10 seconds
    pub fn progress_update_interval(mut self, interval: Duration) -> Self {
        self.playback.progress_update_interval = interval;
        self
    }

    /// Sets the history debounce window.
    ///
    /// Default: 100 ms. Valid range: 1 ms to 60 s.
    pub fn history_debounce(mut self, window: Duration) -> Self {
        self.playback.history_debounce = window;
        self
    }

    /// Sets all playback tunables at once.
    pub fn playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    /// Default: 3000 ms
    pub fn notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = Some(timeout);
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when the media engine is missing, or
    ///   when the HTTP client or secure store is missing without
    ///   `desktop-shims`
    /// - [`Error::Config`] when a value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let media_engine = self.media_engine.ok_or_else(media_engine_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let api_base_url = self
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let config = CoreConfig {
            api_base_url,
            http_client,
            secure_store,
            media_engine,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            playback: self.playback,
            notification_timeout: self
                .notification_timeout
                .unwrap_or(DEFAULT_NOTIFICATION_TIMEOUT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
