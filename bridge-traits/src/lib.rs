//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP with bearer auth and retry
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Session token persistence (Keychain/Keystore)
//!
//! ### Playback
//! - [`MediaEngine`](playback::MediaEngine) - Native audio player with queue,
//!   transport controls, a status channel and an event stream
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | HTTP + keyring; media engine injected by host |
//! | iOS      | TBD                 | Planned |
//! | Android  | TBD                 | Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing (see `core_runtime::config::CoreConfigBuilder::build`). There is no
//! default media engine; hosts must always inject one.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform-specific errors and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single `Arc<dyn Trait>` can be
//! shared across async tasks.
//!
//! ## Testing
//!
//! The `test-support` feature exposes [`testing`] with in-memory fakes for
//! every trait in this crate.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{
    AppKilledBehavior, Capability, EngineEvent, EngineItem, EngineOptions, EngineStatus,
    MediaEngine,
};
pub use storage::SecureStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
