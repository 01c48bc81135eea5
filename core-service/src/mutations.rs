//! Writes against the server with optimistic cache updates
//!
//! Each mutation follows the same shape: flip or rewrite the cached value
//! first, send the request, then invalidate so the server's answer replaces
//! the guess. Nothing is rolled back by hand; the refetch is the rollback.

use core_api::ApiClient;
use core_cache::{QueryKey, ServerCache};
use core_library::{without_history_entries, HistoryDay, Playlist, Visibility};
use tracing::{debug, info, instrument};

use crate::error::{CoreError, Result};
use crate::notifications::NotificationCoordinator;
use crate::queries::keys;

pub const HISTORY_CLEARED: &str = "History is cleared";
pub const PLAYLIST_CREATED: &str = "Playlist successfully created";
pub const PLAYLIST_UPDATED: &str = "Playlist successfully updated";
pub const PLAYLIST_TITLE_MISSING: &str = "Title is missing!";

#[derive(Clone)]
pub struct Mutations {
    api: ApiClient,
    cache: ServerCache,
    notifications: NotificationCoordinator,
}

impl Mutations {
    pub fn new(api: ApiClient, cache: ServerCache, notifications: NotificationCoordinator) -> Self {
        Self {
            api,
            cache,
            notifications,
        }
    }

    /// Flip `("is-favorite", id)` now, then toggle on the server.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, track_id: &str) -> Result<()> {
        if track_id.is_empty() {
            return Ok(());
        }
        let api = self.api.clone();
        let result = self
            .cache
            .mutate(
                track_id.to_string(),
                |cache, id| flip(cache, (keys::IS_FAVORITE, id.as_str())),
                |id| async move { api.toggle_favorite(&id).await },
            )
            .await;

        self.cache.invalidate((keys::IS_FAVORITE, track_id));
        if result.is_ok() {
            self.cache.invalidate(keys::USER_FAVORITES);
        }
        self.finish(result)
    }

    /// Flip `("is-following", uid)` now, then toggle on the server.
    #[instrument(skip(self))]
    pub async fn toggle_follow(&self, user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Ok(());
        }
        let api = self.api.clone();
        let result = self
            .cache
            .mutate(
                user_id.to_string(),
                |cache, id| flip(cache, (keys::IS_FOLLOWING, id.as_str())),
                |id| async move { api.toggle_follow(&id).await },
            )
            .await;

        self.cache.invalidate((keys::IS_FOLLOWING, user_id));
        if result.is_ok() {
            // Follower count changed
            self.cache.invalidate((keys::PUBLIC_PROFILE, user_id));
        }
        self.finish(result)
    }

    /// Remove history entries by entry id.
    #[instrument(skip(self), fields(count = entry_ids.len()))]
    pub async fn remove_histories(&self, entry_ids: &[String]) -> Result<()> {
        if entry_ids.is_empty() {
            return Ok(());
        }
        let api = self.api.clone();
        let result = self
            .cache
            .mutate(
                entry_ids.to_vec(),
                |cache, ids| {
                    if cache.get_data::<Vec<HistoryDay>>(keys::USER_HISTORY).is_some() {
                        cache.set_data(keys::USER_HISTORY, |prior: Option<Vec<HistoryDay>>| {
                            without_history_entries(&prior.unwrap_or_default(), ids)
                        });
                    }
                },
                |ids| async move { api.delete_histories(&ids).await },
            )
            .await;

        self.cache.invalidate(keys::USER_HISTORY);
        self.finish(result)
    }

    #[instrument(skip(self))]
    pub async fn clear_history(&self) -> Result<()> {
        let result = self.api.clear_history().await;
        self.cache.invalidate(keys::USER_HISTORY);
        self.finish(result)?;
        info!("History cleared");
        self.notifications.success(HISTORY_CLEARED);
        Ok(())
    }

    /// Create a playlist seeded with `track_id`.
    #[instrument(skip(self))]
    pub async fn create_playlist(&self, track_id: &str, title: &str, visibility: Visibility) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            let error = CoreError::Validation(PLAYLIST_TITLE_MISSING.to_string());
            self.notifications.report(&error);
            return Err(error);
        }

        let result = self.api.create_playlist(track_id, title, visibility).await;
        self.finish(result)?;
        self.cache.invalidate(keys::USER_PLAYLISTS);
        self.notifications.success(PLAYLIST_CREATED);
        Ok(())
    }

    /// Add `track_id` to an existing playlist.
    #[instrument(skip(self, playlist), fields(playlist_id = %playlist.id))]
    pub async fn add_to_playlist(&self, playlist: &Playlist, track_id: &str) -> Result<()> {
        let result = self.api.update_playlist(playlist, track_id).await;
        self.finish(result)?;
        self.cache.invalidate(keys::USER_PLAYLISTS);
        self.cache
            .invalidate((keys::PLAYLIST_AUDIOS, playlist.id.as_str()));
        self.notifications.success(PLAYLIST_UPDATED);
        Ok(())
    }

    /// Notify on failure and lift into [`CoreError`].
    fn finish<T>(&self, result: core_api::Result<T>) -> Result<T> {
        result.map_err(|e| {
            let error = CoreError::from(e);
            debug!(error = %error, "Mutation failed");
            self.notifications.report(&error);
            error
        })
    }
}

fn flip(cache: &ServerCache, key: impl Into<QueryKey>) {
    cache.set_data(key, |prior: Option<bool>| !prior.unwrap_or(false));
}
