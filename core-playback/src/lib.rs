//! # Playback Coordination
//!
//! Everything that talks to the host media engine.
//!
//! ## Overview
//!
//! - [`EngineAdapter`]: once-per-process engine setup and Track to queue
//!   item translation.
//! - [`PlaybackController`]: turns user intents into engine commands and
//!   keeps the `player` slice coherent with the engine queue.
//! - [`TelemetryService`]: consumes engine events, forwards remote controls
//!   and reports listening progress to `/history` through a [`Debouncer`].

pub mod controller;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod telemetry;

pub use controller::PlaybackController;
pub use debounce::Debouncer;
pub use engine::EngineAdapter;
pub use error::{PlaybackError, Result};
pub use telemetry::TelemetryService;
