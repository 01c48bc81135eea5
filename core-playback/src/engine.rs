//! Media engine adapter
//!
//! Typed façade over the host [`MediaEngine`]. It owns the once-per-process
//! setup and the Track to queue-item translation; everything else is a
//! straight pass-through with `BridgeError` lifted into
//! [`PlaybackError`](crate::error::PlaybackError).

use bridge_traits::playback::{EngineEvent, EngineItem, EngineOptions, EngineStatus, MediaEngine};
use core_library::{PlaybackRate, Track, TrackList};
use core_runtime::logging::strip_path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, OnceCell};
use tracing::{debug, info};

use crate::error::Result;

pub struct EngineAdapter {
    engine: Arc<dyn MediaEngine>,
    options: EngineOptions,
    set_up: OnceCell<()>,
    configured: OnceCell<()>,
}

impl EngineAdapter {
    pub fn new(engine: Arc<dyn MediaEngine>, progress_update_interval: Duration) -> Self {
        Self {
            engine,
            options: EngineOptions {
                progress_update_interval,
                ..EngineOptions::default()
            },
            set_up: OnceCell::new(),
            configured: OnceCell::new(),
        }
    }

    /// Set the engine up and apply options, once.
    ///
    /// Setup and options are tracked separately so a failed options call is
    /// retried without setting the player up a second time.
    pub async fn ensure_setup(&self) -> Result<()> {
        self.set_up
            .get_or_try_init(|| async {
                self.engine.setup_player().await?;
                info!("Media engine set up");
                Ok::<_, crate::error::PlaybackError>(())
            })
            .await?;

        self.configured
            .get_or_try_init(|| async {
                self.engine.update_options(self.options.clone()).await?;
                debug!(
                    interval_ms = self.options.progress_update_interval.as_millis() as u64,
                    "Media engine options applied"
                );
                Ok::<_, crate::error::PlaybackError>(())
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.configured.initialized()
    }

    pub fn to_item(track: &Track) -> EngineItem {
        EngineItem {
            id: track.id.clone(),
            title: track.title.clone(),
            url: track.url.clone(),
            artwork: track.poster.clone(),
            artist: track.owner.name.clone(),
            genre: track.category.clone(),
            is_live_stream: true,
        }
    }

    /// Append every track of `list` to the engine queue.
    pub async fn load(&self, list: &TrackList) -> Result<()> {
        let items: Vec<EngineItem> = list.iter().map(Self::to_item).collect();
        debug!(
            count = items.len(),
            first = items.first().map(|item| strip_path(&item.url)).unwrap_or_default(),
            "Loading queue"
        );
        self.engine.add(items).await?;
        Ok(())
    }

    pub async fn reset(&self) -> Result<()> {
        Ok(self.engine.reset().await?)
    }

    pub async fn skip(&self, index: usize) -> Result<()> {
        Ok(self.engine.skip(index).await?)
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        Ok(self.engine.skip_to_next().await?)
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        Ok(self.engine.skip_to_previous().await?)
    }

    pub async fn play(&self) -> Result<()> {
        Ok(self.engine.play().await?)
    }

    pub async fn pause(&self) -> Result<()> {
        Ok(self.engine.pause().await?)
    }

    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        Ok(self.engine.seek_to(seconds).await?)
    }

    pub async fn set_rate(&self, rate: PlaybackRate) -> Result<()> {
        Ok(self.engine.set_rate(rate.as_f32()).await?)
    }

    pub async fn queue(&self) -> Result<Vec<EngineItem>> {
        Ok(self.engine.get_queue().await?)
    }

    pub async fn current_index(&self) -> Result<Option<usize>> {
        Ok(self.engine.get_current_track().await?)
    }

    pub async fn position(&self) -> Result<f64> {
        Ok(self.engine.get_position().await?)
    }

    pub async fn duration(&self) -> Result<f64> {
        Ok(self.engine.get_duration().await?)
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn watch_status(&self) -> watch::Receiver<EngineStatus> {
        self.engine.watch_status()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::playback::Capability;
    use bridge_traits::testing::{EngineCommand, FakeMediaEngine};
    use core_library::Owner;

    fn track() -> Track {
        Track {
            id: "t1".to_string(),
            title: "Pilot".to_string(),
            url: "https://cdn.test/t1.mp3".to_string(),
            poster: Some("https://cdn.test/t1.jpg".to_string()),
            owner: Owner {
                id: "u1".to_string(),
                name: "Host".to_string(),
            },
            category: "Science".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_track_to_item() {
        let item = EngineAdapter::to_item(&track());
        assert_eq!(item.id, "t1");
        assert_eq!(item.artwork.as_deref(), Some("https://cdn.test/t1.jpg"));
        assert_eq!(item.artist, "Host");
        assert_eq!(item.genre, "Science");
        assert!(item.is_live_stream);
    }

    #[tokio::test]
    async fn test_setup_runs_once() {
        let engine = Arc::new(FakeMediaEngine::new());
        let adapter = EngineAdapter::new(engine.clone(), Duration::from_secs(1));

        adapter.ensure_setup().await.unwrap();
        adapter.ensure_setup().await.unwrap();

        assert_eq!(engine.setup_calls(), 1);
        assert!(adapter.is_initialized());
        let options = engine.options().unwrap();
        assert_eq!(options.progress_update_interval, Duration::from_secs(1));
        assert!(options.capabilities.contains(&Capability::SkipToNext));
    }

    #[tokio::test]
    async fn test_failed_setup_is_retried() {
        let engine = Arc::new(FakeMediaEngine::new());
        let adapter = EngineAdapter::new(engine.clone(), Duration::from_secs(10));

        engine.fail_next_command("audio session busy");
        assert!(adapter.ensure_setup().await.is_err());
        assert!(!adapter.is_initialized());

        adapter.ensure_setup().await.unwrap();
        assert_eq!(
            engine.commands(),
            vec![EngineCommand::Setup, EngineCommand::UpdateOptions]
        );
    }

    #[tokio::test]
    async fn test_load_adds_items_in_order() {
        let engine = Arc::new(FakeMediaEngine::new());
        let adapter = EngineAdapter::new(engine.clone(), Duration::from_secs(10));
        adapter.ensure_setup().await.unwrap();

        let mut second = track();
        second.id = "t2".to_string();
        adapter
            .load(&TrackList::from(vec![track(), second]))
            .await
            .unwrap();

        assert_eq!(engine.queue_ids(), vec!["t1", "t2"]);
        assert_eq!(adapter.status(), EngineStatus::Ready);
    }
}
