//! Playback controller
//!
//! Mediates between user intent, the media engine and the `player` slice.
//!
//! ## Decision table for [`PlaybackController::play_track_from_list`]
//!
//! With `same_track` meaning the requested track is the current one and
//! `same_list` meaning the requested list has the current list's ordered ids:
//!
//! | Engine status | same_track | same_list | Commands |
//! |---------------|------------|-----------|----------|
//! | None          | any        | any       | load, skip, play |
//! | Playing       | yes        | yes       | pause |
//! | other         | yes        | yes       | play |
//! | any           | yes        | no        | reset, load, skip, play |
//! | any           | no         | yes       | pause, skip, play |
//! | any           | no         | no        | pause, reset, load, skip, play |
//!
//! "other" is any initialized status except Playing: Paused, Ready, Stopped,
//! Buffering or Connecting. Tapping the playing track from a different list
//! switches to that list, so a successful call always leaves the requested
//! list current.
//!
//! ## Serialization
//!
//! Every operation holds one async mutex from its first engine call to its
//! last state update, so the table always sees a consistent snapshot and
//! overlapping gestures never interleave `reset` and `add`.
//!
//! ## State updates
//!
//! The player slice changes only after the engine acknowledged the last
//! command of an operation. A rejected command leaves it untouched.

use bridge_traits::playback::EngineStatus;
use core_library::{PlaybackRate, Track, TrackList};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_state::{PlayerAction, PlayerSlice, PlayerState, SliceStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::engine::EngineAdapter;
use crate::error::{PlaybackError, Result};

pub struct PlaybackController {
    engine: Arc<EngineAdapter>,
    player: SliceStore<PlayerSlice>,
    events: EventBus,
    gate: Mutex<()>,
}

impl PlaybackController {
    pub fn new(engine: Arc<EngineAdapter>, player: SliceStore<PlayerSlice>, events: EventBus) -> Self {
        Self {
            engine,
            player,
            events,
            gate: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<EngineAdapter> {
        &self.engine
    }

    pub fn state(&self) -> Arc<PlayerState> {
        self.player.get()
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    // ========================================================================
    // User intents
    // ========================================================================

    /// Play `track` as part of `list`, following the decision table above.
    #[instrument(skip_all, fields(track_id = %track.id, list_len = list.len()))]
    pub async fn play_track_from_list(&self, track: &Track, list: &TrackList) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.play_locked(track, list).await;
        self.report("play_track_from_list", result)
    }

    /// Paused resumes, Playing pauses, anything else is a no-op.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.toggle_locked().await;
        self.report("toggle_play_pause", result)
    }

    /// Start playback if something is loaded and not already playing.
    pub async fn resume(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.resume_locked().await;
        self.report("resume", result)
    }

    /// Pause if playing or waiting for data.
    pub async fn pause(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.pause_locked().await;
        self.report("pause", result)
    }

    /// Seek to `seconds`, clamped to the track.
    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return self.report("seek_to", Err(PlaybackError::InvalidPosition(seconds)));
        }
        let _gate = self.gate.lock().await;
        let result = self.seek_locked(|_| async move { Ok(seconds) }).await;
        self.report("seek_to", result)
    }

    /// Seek relative to the current position, clamped to the track.
    pub async fn seek_by(&self, delta_seconds: f64) -> Result<()> {
        if !delta_seconds.is_finite() {
            return self.report("seek_by", Err(PlaybackError::InvalidPosition(delta_seconds)));
        }
        let _gate = self.gate.lock().await;
        let result = self
            .seek_locked(|engine| async move { Ok(engine.position().await? + delta_seconds) })
            .await;
        self.report("seek_by", result)
    }

    /// Move to the next queue item. A no-op at the end of the queue.
    pub async fn skip_next(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.step_locked(Direction::Next).await;
        self.report("skip_next", result)
    }

    /// Move to the previous queue item. A no-op at the start of the queue.
    pub async fn skip_previous(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.step_locked(Direction::Previous).await;
        self.report("skip_previous", result)
    }

    /// Change the playback speed. Rates outside the menu are rejected
    /// before the engine is touched.
    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        let rate = match PlaybackRate::new(rate) {
            Ok(rate) => rate,
            Err(_) => return self.report("set_rate", Err(PlaybackError::UnsupportedRate(rate))),
        };
        let _gate = self.gate.lock().await;
        let result = self.set_rate_locked(rate).await;
        self.report("set_rate", result)
    }

    /// Empty the engine queue and forget the current track. The rate is kept.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.stop_locked().await;
        self.report("stop", result)
    }

    /// Align the current track with whatever the engine is playing now.
    ///
    /// Used when the engine advances on its own. Serialized with the user
    /// intents so it only ever observes a settled queue.
    pub async fn sync_with_engine(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let result = self.sync_locked().await;
        self.report("sync_with_engine", result)
    }

    // ========================================================================
    // Locked bodies
    // ========================================================================

    async fn play_locked(&self, track: &Track, list: &TrackList) -> Result<()> {
        let index = list
            .index_of(&track.id)
            .ok_or_else(|| PlaybackError::TrackNotInList {
                track_id: track.id.clone(),
            })?;
        self.engine.ensure_setup().await?;

        let state = self.player.get();
        let status = self.engine.status();
        let same_track = state.current_track_id() == Some(track.id.as_str());
        let same_list = state.current_list.same_as(list);
        debug!(%status, same_track, same_list, index, "Deciding playback action");

        if !status.is_ready() {
            self.engine.load(list).await?;
            self.engine.skip(index).await?;
            self.engine.play().await?;
            self.now_playing(track, list);
            return Ok(());
        }

        if same_track {
            if same_list && status.is_playing() {
                self.engine.pause().await?;
                self.emit(PlaybackEvent::Paused {
                    track_id: track.id.clone(),
                });
            } else if same_list {
                self.engine.play().await?;
                self.emit(PlaybackEvent::Resumed {
                    track_id: track.id.clone(),
                });
            } else {
                self.engine.reset().await?;
                self.engine.load(list).await?;
                self.engine.skip(index).await?;
                self.engine.play().await?;
                self.now_playing(track, list);
            }
            return Ok(());
        }

        if same_list {
            self.engine.pause().await?;
            self.engine.skip(index).await?;
            self.engine.play().await?;
            self.player
                .dispatch(PlayerAction::SetCurrentTrack(track.clone()));
            self.emit(PlaybackEvent::TrackChanged {
                track_id: track.id.clone(),
                index,
            });
            return Ok(());
        }

        self.engine.pause().await?;
        self.engine.reset().await?;
        self.engine.load(list).await?;
        self.engine.skip(index).await?;
        self.engine.play().await?;
        self.now_playing(track, list);
        Ok(())
    }

    async fn stop_locked(&self) -> Result<()> {
        // An engine that was never set up has nothing queued.
        if self.engine.is_initialized() {
            if self.engine.status().is_playing() {
                self.engine.pause().await?;
            }
            self.engine.reset().await?;
        }
        self.player.dispatch(PlayerAction::Reset);
        Ok(())
    }

    async fn toggle_locked(&self) -> Result<()> {
        self.engine.ensure_setup().await?;
        match self.engine.status() {
            EngineStatus::Paused => self.resume_locked().await,
            EngineStatus::Playing => self.pause_locked().await,
            status => {
                debug!(%status, "Toggle ignored");
                Ok(())
            }
        }
    }

    async fn resume_locked(&self) -> Result<()> {
        self.engine.ensure_setup().await?;
        let status = self.engine.status();
        if !status.is_ready() || status.is_playing() {
            debug!(%status, "Nothing to resume");
            return Ok(());
        }
        self.engine.play().await?;
        if let Some(track_id) = self.player.get().current_track_id() {
            self.emit(PlaybackEvent::Resumed {
                track_id: track_id.to_string(),
            });
        }
        Ok(())
    }

    async fn pause_locked(&self) -> Result<()> {
        self.engine.ensure_setup().await?;
        let status = self.engine.status();
        if !(status.is_playing() || status.is_buffering()) {
            debug!(%status, "Nothing to pause");
            return Ok(());
        }
        self.engine.pause().await?;
        if let Some(track_id) = self.player.get().current_track_id() {
            self.emit(PlaybackEvent::Paused {
                track_id: track_id.to_string(),
            });
        }
        Ok(())
    }

    async fn seek_locked<'a, F, Fut>(&'a self, target: F) -> Result<()>
    where
        F: FnOnce(&'a EngineAdapter) -> Fut,
        Fut: std::future::Future<Output = Result<f64>>,
    {
        self.engine.ensure_setup().await?;
        let requested = target(self.engine.as_ref()).await?;
        let duration = self.engine.duration().await?;
        let position = clamp_position(requested, duration);
        debug!(requested, position, duration, "Seeking");
        self.engine.seek_to(position).await
    }

    async fn step_locked(&self, direction: Direction) -> Result<()> {
        self.engine.ensure_setup().await?;

        // The live queue, not the current list, decides where the neighbor is.
        let queue = self.engine.queue().await?;
        let Some(current) = self.engine.current_index().await? else {
            debug!("Nothing queued");
            return Ok(());
        };
        let neighbor = match direction {
            Direction::Next => current.checked_add(1).filter(|i| *i < queue.len()),
            Direction::Previous => current.checked_sub(1),
        };
        let Some(neighbor) = neighbor else {
            debug!(current, ?direction, "Already at the edge of the queue");
            return Ok(());
        };

        match direction {
            Direction::Next => self.engine.skip_to_next().await?,
            Direction::Previous => self.engine.skip_to_previous().await?,
        }

        let state = self.player.get();
        match track_for_index(&state, neighbor, queue.get(neighbor).map(|item| item.id.as_str())) {
            Some(track) => {
                let track_id = track.id.clone();
                self.player.dispatch(PlayerAction::SetCurrentTrack(track));
                self.emit(PlaybackEvent::TrackChanged {
                    track_id,
                    index: neighbor,
                });
            }
            None => warn!(index = neighbor, "Engine queue and current list disagree"),
        }
        Ok(())
    }

    async fn set_rate_locked(&self, rate: PlaybackRate) -> Result<()> {
        self.engine.ensure_setup().await?;
        self.engine.set_rate(rate).await?;
        self.player.dispatch(PlayerAction::SetRate(rate));
        self.emit(PlaybackEvent::RateChanged {
            rate: rate.as_f32(),
        });
        Ok(())
    }

    async fn sync_locked(&self) -> Result<()> {
        let Some(index) = self.engine.current_index().await? else {
            return Ok(());
        };
        let queue = self.engine.queue().await?;
        let Some(item) = queue.get(index) else {
            return Ok(());
        };

        let state = self.player.get();
        if state.current_track_id() == Some(item.id.as_str()) {
            return Ok(());
        }
        match track_for_index(&state, index, Some(item.id.as_str())) {
            Some(track) => {
                debug!(track_id = %track.id, index, "Following engine track change");
                let track_id = track.id.clone();
                self.player.dispatch(PlayerAction::SetCurrentTrack(track));
                self.emit(PlaybackEvent::TrackChanged { track_id, index });
            }
            None => warn!(index, item_id = %item.id, "Engine is playing a track outside the current list"),
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn now_playing(&self, track: &Track, list: &TrackList) {
        self.player.dispatch(PlayerAction::SetNowPlaying {
            track: track.clone(),
            list: list.clone(),
        });
        self.emit(PlaybackEvent::QueueLoaded {
            list_len: list.len(),
            provenance: list.provenance().to_string(),
        });
        self.emit(PlaybackEvent::TrackStarted {
            track_id: track.id.clone(),
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        self.events.emit(CoreEvent::Playback(event)).ok();
    }

    fn report<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if error.is_invalid_input() {
                debug!(operation, error = %error, "Playback request rejected");
            } else {
                warn!(operation, error = %error, "Playback command failed");
                self.emit(PlaybackEvent::Error {
                    message: error.to_string(),
                });
            }
        }
        result
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

/// `current_list[index]` when it matches the engine item, else the first
/// track in the list with the engine item's id.
fn track_for_index(state: &PlayerState, index: usize, engine_id: Option<&str>) -> Option<Track> {
    let list = &state.current_list;
    match engine_id {
        Some(id) => list
            .get(index)
            .filter(|t| t.id == id)
            .or_else(|| list.iter().find(|t| t.id == id))
            .cloned(),
        None => list.get(index).cloned(),
    }
}

/// Clamp to `[0, duration]`. An unknown duration (zero or not finite) only
/// bounds from below.
fn clamp_position(seconds: f64, duration: f64) -> f64 {
    let lower = seconds.max(0.0);
    if duration.is_finite() && duration > 0.0 {
        lower.min(duration)
    } else {
        lower
    }
}
