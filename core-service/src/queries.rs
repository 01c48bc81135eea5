//! Read hooks over the server cache
//!
//! One method per cache key. Parameterized queries stay disabled while their
//! id is empty, matching a screen that has nothing selected yet.

use core_api::{ApiClient, ApiError, GENERIC_ERROR_MESSAGE};
use core_cache::{QueryHandle, QueryKey, QueryOptions, ServerCache};
use core_library::{HistoryDay, Playlist, PlaylistAudios, PublicProfile, Track};
use std::future::Future;
use tracing::warn;

use crate::notifications::NotificationCoordinator;

/// Cache key names.
pub mod keys {
    pub const LATEST_UPLOADS: &str = "latestUploads";
    pub const RECOMMENDED: &str = "recommended";
    pub const RECOMMENDED_PLAYLISTS: &str = "recommended-playlists";
    pub const RECENTLY_PLAYED: &str = "recently-played";
    pub const USER_PLAYLISTS: &str = "user-playlists";
    pub const USER_UPLOADS: &str = "user-uploads";
    pub const USER_FAVORITES: &str = "user-favorites";
    pub const USER_HISTORY: &str = "user-history";
    pub const IS_FAVORITE: &str = "is-favorite";
    pub const IS_FOLLOWING: &str = "is-following";
    pub const PUBLIC_PROFILE: &str = "public-profile";
    pub const PUBLIC_PROFILE_AUDIOS: &str = "public-profile-audios";
    pub const PUBLIC_PROFILE_PLAYLISTS: &str = "public-profile-playlists";
    pub const PLAYLIST_AUDIOS: &str = "profile-playlists-audios";
}

/// Route every failed fetch to the notification slice.
pub(crate) fn install_error_hook(cache: &ServerCache, notifications: NotificationCoordinator) {
    cache.set_error_hook(move |key, error| {
        let message = error
            .downcast_ref::<ApiError>()
            .map(ApiError::user_message)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
        warn!(key = %key, error = %error, "Query failed");
        notifications.error(message);
    });
}

#[derive(Clone)]
pub struct Queries {
    api: ApiClient,
    cache: ServerCache,
}

impl Queries {
    pub fn new(api: ApiClient, cache: ServerCache) -> Self {
        Self { api, cache }
    }

    fn entry<T, F, Fut>(&self, key: impl Into<QueryKey>, enabled: bool, fetch: F) -> QueryHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(ApiClient) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core_api::Result<T>> + Send + 'static,
    {
        let api = self.api.clone();
        self.cache
            .use_entry(key, move || fetch(api.clone()), QueryOptions::enabled(enabled))
    }

    pub fn latest_uploads(&self) -> QueryHandle<Vec<Track>> {
        self.entry(keys::LATEST_UPLOADS, true, |api| async move {
            api.latest_uploads().await
        })
    }

    pub fn recommended(&self) -> QueryHandle<Vec<Track>> {
        self.entry(keys::RECOMMENDED, true, |api| async move { api.recommended().await })
    }

    pub fn recommended_playlists(&self) -> QueryHandle<Vec<Playlist>> {
        self.entry(keys::RECOMMENDED_PLAYLISTS, true, |api| async move {
            api.recommended_playlists().await
        })
    }

    pub fn recently_played(&self) -> QueryHandle<Vec<Track>> {
        self.entry(keys::RECENTLY_PLAYED, true, |api| async move {
            api.recently_played().await
        })
    }

    pub fn user_playlists(&self) -> QueryHandle<Vec<Playlist>> {
        self.entry(keys::USER_PLAYLISTS, true, |api| async move {
            api.user_playlists().await
        })
    }

    pub fn user_uploads(&self) -> QueryHandle<Vec<Track>> {
        self.entry(keys::USER_UPLOADS, true, |api| async move { api.user_uploads().await })
    }

    pub fn user_favorites(&self) -> QueryHandle<Vec<Track>> {
        self.entry(keys::USER_FAVORITES, true, |api| async move {
            api.user_favorites().await
        })
    }

    pub fn user_history(&self) -> QueryHandle<Vec<HistoryDay>> {
        self.entry(keys::USER_HISTORY, true, |api| async move { api.history().await })
    }

    pub fn is_favorite(&self, track_id: &str) -> QueryHandle<bool> {
        let id = track_id.to_string();
        self.entry((keys::IS_FAVORITE, track_id), !track_id.is_empty(), move |api| {
            let id = id.clone();
            async move { api.is_favorite(&id).await }
        })
    }

    pub fn is_following(&self, user_id: &str) -> QueryHandle<bool> {
        let id = user_id.to_string();
        self.entry((keys::IS_FOLLOWING, user_id), !user_id.is_empty(), move |api| {
            let id = id.clone();
            async move { api.is_following(&id).await }
        })
    }

    pub fn public_profile(&self, user_id: &str) -> QueryHandle<PublicProfile> {
        let id = user_id.to_string();
        self.entry((keys::PUBLIC_PROFILE, user_id), !user_id.is_empty(), move |api| {
            let id = id.clone();
            async move { api.public_profile(&id).await }
        })
    }

    pub fn public_uploads(&self, user_id: &str) -> QueryHandle<Vec<Track>> {
        let id = user_id.to_string();
        self.entry(
            (keys::PUBLIC_PROFILE_AUDIOS, user_id),
            !user_id.is_empty(),
            move |api| {
                let id = id.clone();
                async move { api.public_uploads(&id).await }
            },
        )
    }

    pub fn public_playlists(&self, user_id: &str) -> QueryHandle<Vec<Playlist>> {
        let id = user_id.to_string();
        self.entry(
            (keys::PUBLIC_PROFILE_PLAYLISTS, user_id),
            !user_id.is_empty(),
            move |api| {
                let id = id.clone();
                async move { api.public_playlists(&id).await }
            },
        )
    }

    /// Tracks of a playlist; `is_private` picks the owner-only endpoint.
    pub fn playlist_audios(&self, playlist_id: &str, is_private: bool) -> QueryHandle<PlaylistAudios> {
        let id = playlist_id.to_string();
        self.entry(
            (keys::PLAYLIST_AUDIOS, playlist_id),
            !playlist_id.is_empty(),
            move |api| {
                let id = id.clone();
                async move { api.playlist_audios(&id, is_private).await }
            },
        )
    }
}
