//! Media engine bridge and supporting types.
//!
//! The media engine is the native audio player that owns decoding, buffering,
//! the OS media session and lock-screen controls. The core never touches audio
//! samples; it drives the engine through an imperative queue API and observes
//! it through a status channel and an event stream.
//!
//! ## Surface
//!
//! - **Setup**: [`MediaEngine::setup_player`] then [`MediaEngine::update_options`].
//! - **Queue**: `add`, `reset`, `skip`, `skip_to_next`, `skip_to_previous`.
//! - **Transport**: `play`, `pause`, `seek_to`, `set_rate`.
//! - **Queries**: `get_queue`, `get_current_track`, `get_position`, `get_duration`.
//! - **Observation**: [`MediaEngine::watch_status`] and [`MediaEngine::subscribe_events`].
//!
//! Every command resolves once the engine has acknowledged it. A rejected
//! command surfaces as [`BridgeError`](crate::error::BridgeError).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use crate::error::Result;

/// Engine playback status as reported by the host player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineStatus {
    /// Nothing loaded; the queue is empty or the engine was reset.
    #[default]
    None,
    Ready,
    Playing,
    Paused,
    Buffering,
    Connecting,
    Stopped,
}

impl EngineStatus {
    /// Anything other than [`EngineStatus::None`].
    pub fn is_ready(&self) -> bool {
        !matches!(self, EngineStatus::None)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, EngineStatus::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, EngineStatus::Paused)
    }

    /// Buffering and Connecting both mean "waiting for bytes".
    pub fn is_buffering(&self) -> bool {
        matches!(self, EngineStatus::Buffering | EngineStatus::Connecting)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineStatus::None => "none",
            EngineStatus::Ready => "ready",
            EngineStatus::Playing => "playing",
            EngineStatus::Paused => "paused",
            EngineStatus::Buffering => "buffering",
            EngineStatus::Connecting => "connecting",
            EngineStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// One queue entry as the engine understands it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub artwork: Option<String>,
    pub artist: String,
    pub genre: String,
    pub is_live_stream: bool,
}

/// Remote-control capabilities exposed on the OS media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Play,
    Pause,
    SkipToNext,
    SkipToPrevious,
    SeekTo,
    Stop,
}

/// What the engine does when the host process is killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppKilledBehavior {
    ContinuePlayback,
    PausePlayback,
    #[default]
    StopPlaybackAndRemoveNotification,
}

/// Options applied once after setup.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Cadence of [`EngineEvent::PlaybackProgress`].
    pub progress_update_interval: Duration,
    pub capabilities: Vec<Capability>,
    pub compact_capabilities: Vec<Capability>,
    pub app_killed_behavior: AppKilledBehavior,
}

impl Default for EngineOptions {
    fn default() -> Self {
        let transport = vec![
            Capability::Play,
            Capability::Pause,
            Capability::SkipToNext,
            Capability::SkipToPrevious,
        ];
        Self {
            progress_update_interval: Duration::from_secs(10),
            capabilities: transport.clone(),
            compact_capabilities: transport,
            app_killed_behavior: AppKilledBehavior::StopPlaybackAndRemoveNotification,
        }
    }
}

/// Events pushed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Play pressed on the OS media controls.
    RemotePlay,
    RemotePause,
    RemoteNext,
    RemotePrevious,
    /// Periodic progress for the item at `track_index`.
    PlaybackProgress {
        track_index: usize,
        position: f64,
        duration: f64,
    },
    /// The engine moved to another queue item on its own or by command.
    PlaybackTrackChanged {
        previous: Option<usize>,
        next: Option<usize>,
        /// Position reached in `previous` when it was left.
        position: f64,
    },
    /// The last item in the queue finished.
    PlaybackQueueEnded {
        track_index: Option<usize>,
        position: f64,
    },
    PlaybackError {
        message: String,
    },
}

/// Host media engine contract.
///
/// Commands are issued only by the playback controller and the telemetry
/// service. Implementations must be safe to share behind an `Arc`.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Initialize the native player. Calling this twice is an error on most
    /// hosts; callers must guard it.
    async fn setup_player(&self) -> Result<()>;

    async fn update_options(&self, options: EngineOptions) -> Result<()>;

    /// Append items to the end of the queue.
    async fn add(&self, items: Vec<EngineItem>) -> Result<()>;

    /// Clear the queue and stop playback. Status returns to `None`.
    async fn reset(&self) -> Result<()>;

    /// Jump to the queue item at `index`.
    async fn skip(&self, index: usize) -> Result<()>;

    async fn skip_to_next(&self) -> Result<()>;

    async fn skip_to_previous(&self) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek_to(&self, seconds: f64) -> Result<()>;

    async fn set_rate(&self, rate: f32) -> Result<()>;

    async fn get_queue(&self) -> Result<Vec<EngineItem>>;

    /// Index of the current queue item, `None` when the queue is empty.
    async fn get_current_track(&self) -> Result<Option<usize>>;

    async fn get_position(&self) -> Result<f64>;

    async fn get_duration(&self) -> Result<f64>;

    /// Status channel. The current value is always readable.
    fn watch_status(&self) -> watch::Receiver<EngineStatus>;

    /// Event stream. Each call returns an independent receiver.
    fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent>;

    /// Snapshot of the current status.
    fn status(&self) -> EngineStatus {
        *self.watch_status().borrow()
    }
}
