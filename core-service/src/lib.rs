//! Core service façade and bootstrap helpers.
//!
//! [`CoreService::new`] wires a [`CoreConfig`] into the shared core: the
//! observable store, server cache, API client, playback controller and
//! telemetry service. Hosts keep one service per process and call
//! [`CoreService::start`] once a tokio runtime is available.
//!
//! Every user-facing operation funnels its failure through the
//! [`NotificationCoordinator`] before returning it, so callers may ignore
//! the error if they only care about the notification.

pub mod error;
pub mod mutations;
pub mod notifications;
pub mod queries;
pub mod session;

pub use error::{CoreError, Result};
pub use mutations::Mutations;
pub use notifications::NotificationCoordinator;
pub use queries::{keys, Queries};
pub use session::Session;

pub use core_runtime::{logging, CoreConfig, CoreConfigBuilder, CoreEvent, EventBus};

use core_api::ApiClient;
use core_auth::{SessionToken, TokenStore};
use core_cache::ServerCache;
use core_library::{Playlist, Profile, Track, TrackList, Visibility};
use core_playback::{EngineAdapter, PlaybackController, TelemetryService};
use core_state::{AppStore, PlaylistModalAction, PlaylistModalState};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    store: AppStore,
    events: EventBus,
    api: ApiClient,
    cache: ServerCache,
    controller: Arc<PlaybackController>,
    telemetry: Arc<TelemetryService>,
    notifications: NotificationCoordinator,
    queries: Queries,
    mutations: Mutations,
    session: Session,
}

impl CoreService {
    /// Wire every component from `config`. Nothing is spawned until
    /// [`start`](Self::start).
    pub fn new(config: CoreConfig) -> Self {
        let store = AppStore::new();
        let events = EventBus::new(config.event_buffer_size);

        let tokens = TokenStore::new(Arc::clone(&config.secure_store));
        let api = ApiClient::new(Arc::clone(&config.http_client), config.api_base_url.clone(), tokens);

        let notifications = NotificationCoordinator::new(
            store.notification.clone(),
            events.clone(),
            config.notification_timeout,
        );

        let cache = ServerCache::new();
        queries::install_error_hook(&cache, notifications.clone());

        let engine = Arc::new(EngineAdapter::new(
            Arc::clone(&config.media_engine),
            config.playback.progress_update_interval,
        ));
        let controller = Arc::new(PlaybackController::new(
            engine,
            store.player.clone(),
            events.clone(),
        ));
        let telemetry = Arc::new(TelemetryService::new(
            Arc::clone(&controller),
            api.clone(),
            Arc::clone(&config.clock),
            events.clone(),
            config.playback.history_debounce,
        ));

        let queries = Queries::new(api.clone(), cache.clone());
        let mutations = Mutations::new(api.clone(), cache.clone(), notifications.clone());
        let session = Session::new(
            api.clone(),
            store.auth.clone(),
            Arc::clone(&controller),
            notifications.clone(),
        );

        info!(api_base_url = %config.api_base_url, "Core service initialized");

        Self {
            store,
            events,
            api,
            cache,
            controller,
            telemetry,
            notifications,
            queries,
            mutations,
            session,
        }
    }

    /// Start background event handling. Returns `false` if already started.
    pub fn start(&self) -> bool {
        self.telemetry.start()
    }

    pub fn shutdown(&self) {
        self.telemetry.shutdown();
        info!("Core service shut down");
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &ServerCache {
        &self.cache
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn notifications(&self) -> &NotificationCoordinator {
        &self.notifications
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    pub fn telemetry(&self) -> &Arc<TelemetryService> {
        &self.telemetry
    }

    // ========================================================================
    // Playback
    // ========================================================================

    pub async fn play_track_from_list(&self, track: &Track, list: &TrackList) -> Result<()> {
        self.surface(self.controller.play_track_from_list(track, list).await)
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.surface(self.controller.toggle_play_pause().await)
    }

    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        self.surface(self.controller.seek_to(seconds).await)
    }

    pub async fn seek_by(&self, delta_seconds: f64) -> Result<()> {
        self.surface(self.controller.seek_by(delta_seconds).await)
    }

    pub async fn skip_next(&self) -> Result<()> {
        self.surface(self.controller.skip_next().await)
    }

    pub async fn skip_previous(&self) -> Result<()> {
        self.surface(self.controller.skip_previous().await)
    }

    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        self.surface(self.controller.set_rate(rate).await)
    }

    fn surface(&self, result: core_playback::Result<()>) -> Result<()> {
        result.map_err(|e| {
            let error = CoreError::from(e);
            self.notifications.report(&error);
            error
        })
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn toggle_favorite(&self, track_id: &str) -> Result<()> {
        self.mutations.toggle_favorite(track_id).await
    }

    pub async fn toggle_follow(&self, user_id: &str) -> Result<()> {
        self.mutations.toggle_follow(user_id).await
    }

    pub async fn remove_histories(&self, entry_ids: &[String]) -> Result<()> {
        self.mutations.remove_histories(entry_ids).await
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.mutations.clear_history().await
    }

    pub async fn create_playlist(&self, track_id: &str, title: &str, visibility: Visibility) -> Result<()> {
        self.mutations.create_playlist(track_id, title, visibility).await
    }

    pub async fn add_to_playlist(&self, playlist: &Playlist, track_id: &str) -> Result<()> {
        self.mutations.add_to_playlist(playlist, track_id).await
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub async fn restore_session(&self) -> Result<bool> {
        self.session.restore().await
    }

    pub async fn sign_in_with_token(&self, token: impl Into<String>, profile: Profile) -> Result<()> {
        self.session.sign_in(SessionToken::new(token), profile).await
    }

    pub async fn logout(&self, from_all: bool) -> Result<()> {
        self.session.logout(from_all).await
    }

    // ========================================================================
    // Playlist modal
    // ========================================================================

    /// Show the playlist picker for `playlist_id`.
    pub fn open_playlist_modal(&self, playlist_id: impl Into<String>, is_private: bool) {
        let modal = &self.store.playlist_modal;
        modal.dispatch(PlaylistModalAction::SetSelectedListId(Some(playlist_id.into())));
        modal.dispatch(PlaylistModalAction::SetPrivate(Some(is_private)));
        modal.dispatch(PlaylistModalAction::SetVisible(true));
    }

    pub fn close_playlist_modal(&self) {
        let modal = &self.store.playlist_modal;
        modal.dispatch(PlaylistModalAction::SetVisible(false));
        modal.dispatch(PlaylistModalAction::SetSelectedListId(None));
        modal.dispatch(PlaylistModalAction::SetPrivate(None));
    }

    pub fn playlist_modal(&self) -> Arc<PlaylistModalState> {
        self.store.playlist_modal.get()
    }
}
