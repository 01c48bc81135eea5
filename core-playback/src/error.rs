//! # Playback Error Types

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors surfaced by the playback controller.
///
/// The controller never retries; a failed command leaves the player slice
/// as it was before the call.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The media engine rejected or failed a command.
    #[error("Media engine error: {0}")]
    Engine(#[from] BridgeError),

    /// Not one of 0.25, 0.5, ... 2.0.
    #[error("Unsupported playback rate: {0}")]
    UnsupportedRate(f32),

    #[error("Track {track_id} is not part of the requested list")]
    TrackNotInList { track_id: String },

    #[error("Invalid seek position: {0}")]
    InvalidPosition(f64),
}

impl PlaybackError {
    /// Errors caused by the caller's input rather than the engine.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PlaybackError::UnsupportedRate(_)
                | PlaybackError::TrackNotInList { .. }
                | PlaybackError::InvalidPosition(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
