//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast bridge validation
//! - Event bus system
//!
//! Every other core crate depends on this one for its config and event
//! types; none of them install a global subscriber themselves.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, PlaybackConfig};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
