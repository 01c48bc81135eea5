//! Playback telemetry service
//!
//! Background subscriber on the media engine's event stream:
//!
//! - OS media control events are forwarded to the controller verbs.
//! - Progress events become [`HistoryRecord`]s, debounced into
//!   `POST /history`. Delivery is fire-and-forget: a failed report is logged
//!   and dropped.
//! - Track changes and queue end flush the pending record right away so the
//!   last progress of a finished track is not lost, and track changes
//!   re-sync the player slice with the engine.

use bridge_traits::playback::EngineEvent;
use bridge_traits::time::Clock;
use core_api::ApiClient;
use core_library::HistoryRecord;
use core_runtime::events::{CoreEvent, EventBus, HistoryEvent, PlaybackEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::controller::PlaybackController;
use crate::debounce::Debouncer;

pub struct TelemetryService {
    controller: Arc<PlaybackController>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    history: Debouncer<HistoryRecord>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl TelemetryService {
    pub fn new(
        controller: Arc<PlaybackController>,
        api: ApiClient,
        clock: Arc<dyn Clock>,
        events: EventBus,
        history_debounce: Duration,
    ) -> Self {
        let sink_events = events.clone();
        let history = Debouncer::new(history_debounce, move |record: HistoryRecord| {
            let api = api.clone();
            let events = sink_events.clone();
            async move { report_history(&api, &events, record).await }
        });

        Self {
            controller,
            clock,
            events,
            history,
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the event loop. Only the first call subscribes; later calls
    /// return `false`.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Telemetry service already running");
            return false;
        }

        let mut engine_events = self.controller.engine().subscribe_events();
        let token = self.shutdown.clone();
        let service = Arc::clone(self);

        tokio::spawn(async move {
            info!("Telemetry service started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = engine_events.recv() => match received {
                        Ok(event) => service.handle_event(event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Telemetry fell behind the engine event stream");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            info!("Telemetry service stopped");
        });
        true
    }

    /// Stop the event loop. A pending history record is delivered first.
    pub fn shutdown(&self) {
        self.history.flush();
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shutdown.is_cancelled()
    }

    /// Handle one engine event. Controller failures are already logged and
    /// published by the controller, so they end here.
    #[instrument(skip(self), level = "debug")]
    pub async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::RemotePlay => {
                self.controller.resume().await.ok();
            }
            EngineEvent::RemotePause => {
                self.controller.pause().await.ok();
            }
            EngineEvent::RemoteNext => {
                self.controller.skip_next().await.ok();
            }
            EngineEvent::RemotePrevious => {
                self.controller.skip_previous().await.ok();
            }
            EngineEvent::PlaybackProgress {
                track_index,
                position,
                ..
            } => self.record_progress(track_index, position).await,
            EngineEvent::PlaybackTrackChanged { next, .. } => {
                self.history.flush();
                if next.is_some() {
                    self.controller.sync_with_engine().await.ok();
                }
            }
            EngineEvent::PlaybackQueueEnded { .. } => {
                self.history.flush();
            }
            EngineEvent::PlaybackError { message } => {
                warn!(%message, "Media engine reported an error");
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::Error { message }))
                    .ok();
            }
        }
    }

    async fn record_progress(&self, track_index: usize, position: f64) {
        let queue = match self.controller.engine().queue().await {
            Ok(queue) => queue,
            Err(error) => {
                warn!(error = %error, "Could not read engine queue for progress");
                return;
            }
        };
        let Some(item) = queue.get(track_index) else {
            debug!(track_index, queue_len = queue.len(), "Progress for an item outside the queue");
            return;
        };

        self.history.call(HistoryRecord {
            audio_id: item.id.clone(),
            progress: position,
            date: self.clock.now(),
        });
    }
}

async fn report_history(api: &ApiClient, events: &EventBus, record: HistoryRecord) {
    match api.post_history(&record).await {
        Ok(()) => {
            debug!(audio_id = %record.audio_id, progress = record.progress, "History reported");
            events
                .emit(CoreEvent::History(HistoryEvent::Reported {
                    audio_id: record.audio_id,
                    progress: record.progress,
                }))
                .ok();
        }
        Err(error) => {
            warn!(audio_id = %record.audio_id, error = %error, "Dropping history record");
            events
                .emit(CoreEvent::History(HistoryEvent::Dropped {
                    audio_id: record.audio_id,
                    reason: error.to_string(),
                }))
                .ok();
        }
    }
}
