//! End-to-end controller scenarios against the in-memory engine.

use bridge_traits::playback::{EngineStatus, MediaEngine};
use bridge_traits::testing::{EngineCommand, FakeMediaEngine};
use core_library::{ListProvenance, Owner, PlaybackRate, Track, TrackList};
use core_playback::{EngineAdapter, PlaybackController, PlaybackError};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_state::{PlayerSlice, PlayerState, SliceStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Episode {}", id),
        url: format!("https://cdn.test/{}.mp3", id),
        poster: None,
        owner: Owner {
            id: "owner".to_string(),
            name: "Host".to_string(),
        },
        category: "Others".to_string(),
        description: None,
    }
}

fn list(ids: &[&str]) -> TrackList {
    TrackList::new(ids.iter().map(|id| track(id)).collect(), ListProvenance::Latest)
}

fn list_ids(state: &PlayerState) -> Vec<String> {
    state.current_list.iter().map(|t| t.id.clone()).collect()
}

struct Harness {
    engine: Arc<FakeMediaEngine>,
    player: SliceStore<PlayerSlice>,
    events: EventBus,
    controller: Arc<PlaybackController>,
}

impl Harness {
    fn new() -> Self {
        let engine = Arc::new(FakeMediaEngine::new());
        let adapter = Arc::new(EngineAdapter::new(engine.clone(), Duration::from_secs(10)));
        let player = SliceStore::<PlayerSlice>::default();
        let events = EventBus::new(64);
        let controller = Arc::new(PlaybackController::new(adapter, player.clone(), events.clone()));
        Self {
            engine,
            player,
            events,
            controller,
        }
    }

    async fn play(&self, id: &str, ids: &[&str]) {
        self.controller
            .play_track_from_list(&track(id), &list(ids))
            .await
            .unwrap();
    }

    fn current_id(&self) -> Option<String> {
        self.player.get().current_track_id().map(str::to_string)
    }

    fn assert_queue_matches_list(&self) {
        assert_eq!(self.engine.queue_ids(), list_ids(&self.player.get()));
    }
}

fn drain(rx: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_scenarios_one_through_six() {
    let h = Harness::new();

    // 1: empty engine
    h.play("T1", &["T1", "T2", "T3"]).await;
    assert_eq!(h.current_id().as_deref(), Some("T1"));
    assert_eq!(h.engine.status(), EngineStatus::Playing);
    assert_eq!(list_ids(&h.player.get()), vec!["T1", "T2", "T3"]);

    // 2: same track while playing pauses
    h.play("T1", &["T1", "T2", "T3"]).await;
    assert_eq!(h.current_id().as_deref(), Some("T1"));
    assert_eq!(h.engine.status(), EngineStatus::Paused);

    // 3: same track, same list while paused resumes
    h.play("T1", &["T1", "T2", "T3"]).await;
    assert_eq!(h.engine.status(), EngineStatus::Playing);

    // 4: other track, same list
    h.play("T2", &["T1", "T2", "T3"]).await;
    assert_eq!(h.current_id().as_deref(), Some("T2"));
    assert_eq!(h.engine.status(), EngineStatus::Playing);
    assert_eq!(list_ids(&h.player.get()), vec!["T1", "T2", "T3"]);

    // 5: the playing track tapped from another list switches lists
    h.play("T2", &["T2", "T4", "T5"]).await;
    assert_eq!(h.current_id().as_deref(), Some("T2"));
    assert_eq!(h.engine.status(), EngineStatus::Playing);
    assert_eq!(list_ids(&h.player.get()), vec!["T2", "T4", "T5"]);
    h.assert_queue_matches_list();

    // 6
    h.controller.skip_next().await.unwrap();
    assert_eq!(h.current_id().as_deref(), Some("T4"));
    assert_eq!(h.engine.status(), EngineStatus::Playing);
    assert_eq!(list_ids(&h.player.get()), vec!["T2", "T4", "T5"]);
    h.assert_queue_matches_list();
}

#[tokio::test]
async fn test_first_play_sets_up_and_loads_queue() {
    let h = Harness::new();
    let mut rx = h.events.subscribe();

    h.play("T2", &["T1", "T2", "T3"]).await;

    assert_eq!(
        h.engine.commands(),
        vec![
            EngineCommand::Setup,
            EngineCommand::UpdateOptions,
            EngineCommand::Add(vec!["T1".into(), "T2".into(), "T3".into()]),
            EngineCommand::Skip(1),
            EngineCommand::Play,
        ]
    );
    assert_eq!(h.engine.current_id().as_deref(), Some("T2"));

    let events = drain(&mut rx);
    assert!(events.contains(&CoreEvent::Playback(PlaybackEvent::QueueLoaded {
        list_len: 3,
        provenance: "latest".to_string(),
    })));
    assert!(events.contains(&CoreEvent::Playback(PlaybackEvent::TrackStarted {
        track_id: "T2".to_string(),
    })));
}

#[tokio::test]
async fn test_other_track_in_same_list_skips_without_reload() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2", "T3"]).await;
    h.engine.clear_commands();

    h.play("T3", &["T1", "T2", "T3"]).await;

    assert_eq!(
        h.engine.commands(),
        vec![EngineCommand::Pause, EngineCommand::Skip(2), EngineCommand::Play]
    );
    assert_eq!(h.current_id().as_deref(), Some("T3"));
}

#[tokio::test]
async fn test_other_track_in_other_list_replaces_queue() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2", "T3"]).await;
    h.engine.clear_commands();

    h.play("T5", &["T4", "T5"]).await;

    assert_eq!(
        h.engine.commands(),
        vec![
            EngineCommand::Pause,
            EngineCommand::Reset,
            EngineCommand::Add(vec!["T4".into(), "T5".into()]),
            EngineCommand::Skip(1),
            EngineCommand::Play,
        ]
    );
    assert_eq!(h.current_id().as_deref(), Some("T5"));
    h.assert_queue_matches_list();
}

#[tokio::test]
async fn test_paused_track_from_another_list_reloads_queue() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2"]).await;
    h.controller.pause().await.unwrap();
    h.engine.clear_commands();

    h.play("T1", &["T9", "T1"]).await;

    assert_eq!(
        h.engine.commands(),
        vec![
            EngineCommand::Reset,
            EngineCommand::Add(vec!["T9".into(), "T1".into()]),
            EngineCommand::Skip(1),
            EngineCommand::Play,
        ]
    );
    assert_eq!(list_ids(&h.player.get()), vec!["T9", "T1"]);
    h.assert_queue_matches_list();
}

#[tokio::test]
async fn test_playing_track_from_another_list_reloads_queue() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2"]).await;
    h.engine.clear_commands();

    h.play("T1", &["T1", "T3"]).await;

    assert_eq!(
        h.engine.commands(),
        vec![
            EngineCommand::Reset,
            EngineCommand::Add(vec!["T1".into(), "T3".into()]),
            EngineCommand::Skip(0),
            EngineCommand::Play,
        ]
    );
    assert_eq!(h.engine.status(), EngineStatus::Playing);
    h.assert_queue_matches_list();
}

#[tokio::test]
async fn test_ready_engine_counts_as_paused() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2"]).await;
    h.engine.set_status(EngineStatus::Ready);
    h.engine.clear_commands();

    h.play("T1", &["T1", "T2"]).await;

    assert_eq!(h.engine.commands(), vec![EngineCommand::Play]);
}

// ============================================================================
// Round-trip laws
// ============================================================================

#[tokio::test]
async fn test_exact_resume_does_not_reload_queue() {
    let tapped = Harness::new();
    tapped.play("T2", &["T1", "T2", "T3"]).await;
    tapped.controller.pause().await.unwrap();
    tapped.play("T2", &["T1", "T2", "T3"]).await;

    let resumed = Harness::new();
    resumed.play("T2", &["T1", "T2", "T3"]).await;
    resumed.controller.pause().await.unwrap();
    resumed.controller.resume().await.unwrap();

    assert_eq!(tapped.player.get(), resumed.player.get());
    assert_eq!(tapped.engine.status(), resumed.engine.status());
    assert_eq!(tapped.engine.queue_ids(), resumed.engine.queue_ids());
    assert_eq!(tapped.engine.commands(), resumed.engine.commands());
}

#[tokio::test]
async fn test_second_tap_is_a_pause() {
    let tapped = Harness::new();
    tapped.play("T1", &["T1", "T2"]).await;
    tapped.play("T1", &["T1", "T2"]).await;

    let paused = Harness::new();
    paused.play("T1", &["T1", "T2"]).await;
    paused.controller.pause().await.unwrap();

    assert_eq!(tapped.player.get(), paused.player.get());
    assert_eq!(tapped.engine.status(), EngineStatus::Paused);
    assert_eq!(tapped.engine.commands(), paused.engine.commands());
}

// ============================================================================
// Rate
// ============================================================================

#[tokio::test]
async fn test_unsupported_rate_changes_nothing() {
    let h = Harness::new();
    h.play("T1", &["T1"]).await;
    h.engine.clear_commands();
    let before = h.player.get();
    let mut rx = h.events.subscribe();

    let result = h.controller.set_rate(3.0).await;

    assert!(matches!(result, Err(PlaybackError::UnsupportedRate(r)) if r == 3.0));
    assert_eq!(h.player.get(), before);
    assert!(h.engine.commands().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_supported_rate_reaches_engine_and_state() {
    let h = Harness::new();
    h.play("T1", &["T1"]).await;

    h.controller.set_rate(1.5).await.unwrap();

    assert_eq!(h.engine.rate(), 1.5);
    assert_eq!(h.player.get().rate, PlaybackRate::new(1.5).unwrap());
}

// ============================================================================
// Skipping
// ============================================================================

#[tokio::test]
async fn test_skip_previous_moves_backward() {
    let h = Harness::new();
    h.play("T3", &["T1", "T2", "T3"]).await;

    h.controller.skip_previous().await.unwrap();
    assert_eq!(h.current_id().as_deref(), Some("T2"));
    assert_eq!(h.engine.current_id().as_deref(), Some("T2"));

    h.controller.skip_previous().await.unwrap();
    assert_eq!(h.current_id().as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_skips_at_queue_edges_are_noops() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2"]).await;
    h.engine.clear_commands();

    h.controller.skip_previous().await.unwrap();
    assert_eq!(h.current_id().as_deref(), Some("T1"));

    h.controller.skip_next().await.unwrap();
    h.controller.skip_next().await.unwrap();
    assert_eq!(h.current_id().as_deref(), Some("T2"));

    assert_eq!(h.engine.commands(), vec![EngineCommand::SkipToNext]);
}

#[tokio::test]
async fn test_skip_on_empty_engine_is_noop() {
    let h = Harness::new();
    h.controller.skip_next().await.unwrap();
    assert!(h.player.get().current_track.is_none());
}

// ============================================================================
// Seeking and toggling
// ============================================================================

#[tokio::test]
async fn test_seek_is_clamped_to_track() {
    let h = Harness::new();
    h.play("T1", &["T1"]).await;
    h.engine.set_duration(100.0);

    h.controller.seek_to(150.0).await.unwrap();
    assert_eq!(h.engine.position(), 100.0);

    h.engine.set_position(5.0);
    h.controller.seek_by(-10.0).await.unwrap();
    assert_eq!(h.engine.position(), 0.0);

    h.controller.seek_by(30.0).await.unwrap();
    assert_eq!(h.engine.position(), 30.0);

    let result = h.controller.seek_to(f64::NAN).await;
    assert!(matches!(result, Err(PlaybackError::InvalidPosition(_))));
}

#[tokio::test]
async fn test_toggle_follows_engine_status() {
    let h = Harness::new();

    // Nothing loaded
    h.controller.toggle_play_pause().await.unwrap();
    assert_eq!(h.engine.status(), EngineStatus::None);

    h.play("T1", &["T1"]).await;
    h.controller.toggle_play_pause().await.unwrap();
    assert_eq!(h.engine.status(), EngineStatus::Paused);
    h.controller.toggle_play_pause().await.unwrap();
    assert_eq!(h.engine.status(), EngineStatus::Playing);
}

#[tokio::test]
async fn test_pause_applies_while_buffering() {
    let h = Harness::new();
    h.play("T1", &["T1"]).await;
    h.engine.set_status(EngineStatus::Connecting);
    h.engine.clear_commands();

    h.controller.pause().await.unwrap();

    assert_eq!(h.engine.commands(), vec![EngineCommand::Pause]);
}

// ============================================================================
// Failures, setup and serialization
// ============================================================================

#[tokio::test]
async fn test_track_outside_list_is_rejected_before_engine() {
    let h = Harness::new();
    let result = h
        .controller
        .play_track_from_list(&track("T9"), &list(&["T1", "T2"]))
        .await;

    assert!(matches!(result, Err(PlaybackError::TrackNotInList { .. })));
    assert!(h.engine.commands().is_empty());
}

#[tokio::test]
async fn test_failed_command_leaves_state_unchanged() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2", "T3"]).await;
    let before = h.player.get();
    let mut rx = h.events.subscribe();

    h.engine.fail_next_command("audio focus lost");
    let result = h
        .controller
        .play_track_from_list(&track("T2"), &list(&["T1", "T2", "T3"]))
        .await;

    assert!(matches!(result, Err(PlaybackError::Engine(_))));
    assert_eq!(h.player.get(), before);
    assert_eq!(h.engine.status(), EngineStatus::Playing);
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Error { .. }))));
}

#[tokio::test]
async fn test_engine_is_set_up_once() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2"]).await;
    h.controller.skip_next().await.unwrap();
    h.controller.set_rate(0.75).await.unwrap();
    h.controller.toggle_play_pause().await.unwrap();
    h.play("T4", &["T4"]).await;

    assert_eq!(h.engine.setup_calls(), 1);
}

#[tokio::test]
async fn test_sync_follows_engine_auto_advance() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2", "T3"]).await;
    let mut rx = h.events.subscribe();

    h.engine.advance_to(2);
    h.controller.sync_with_engine().await.unwrap();

    assert_eq!(h.current_id().as_deref(), Some("T3"));
    assert_eq!(
        drain(&mut rx),
        vec![CoreEvent::Playback(PlaybackEvent::TrackChanged {
            track_id: "T3".to_string(),
            index: 2,
        })]
    );

    // Already in sync: nothing to publish
    h.controller.sync_with_engine().await.unwrap();
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gestures_keep_queue_and_list_aligned() {
    let h = Harness::new();
    let lists: Vec<Vec<&'static str>> = vec![
        vec!["A1", "A2", "A3"],
        vec!["B1", "B2"],
        vec!["A1", "A2", "A3"],
        vec!["C1", "C2", "C3", "C4"],
        vec!["B1", "B2"],
        vec!["D1"],
    ];

    let mut tasks = Vec::new();
    for ids in lists {
        let controller = Arc::clone(&h.controller);
        tasks.push(tokio::spawn(async move {
            let target = ids[ids.len() - 1];
            controller
                .play_track_from_list(&track(target), &list(&ids))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    h.assert_queue_matches_list();
    let state = h.player.get();
    assert_eq!(
        h.engine.current_id(),
        state.current_track_id().map(str::to_string)
    );
}

#[tokio::test]
async fn test_stop_empties_queue_and_keeps_rate() {
    let h = Harness::new();
    h.play("T1", &["T1", "T2"]).await;
    h.controller.set_rate(1.5).await.unwrap();
    h.engine.clear_commands();

    h.controller.stop().await.unwrap();

    assert_eq!(
        h.engine.commands(),
        vec![EngineCommand::Pause, EngineCommand::Reset]
    );
    assert_eq!(h.engine.status(), EngineStatus::None);
    let state = h.player.get();
    assert!(state.current_track.is_none());
    assert!(state.current_list.is_empty());
    assert_eq!(state.rate.as_f32(), 1.5);

    // The next play starts from an empty engine.
    h.play("T2", &["T1", "T2"]).await;
    assert_eq!(h.current_id().as_deref(), Some("T2"));
    h.assert_queue_matches_list();
}

#[tokio::test]
async fn test_stop_before_setup_leaves_engine_alone() {
    let h = Harness::new();
    h.controller.stop().await.unwrap();

    assert!(h.engine.commands().is_empty());
    assert!(h.player.get().current_track.is_none());
}
