//! Podify API client
//!
//! Typed wrappers over the remote catalogue, favorites, history, profile,
//! playlist and session endpoints. Every request carries
//! `Authorization: Bearer <token>` when a session token is stored.

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use core_auth::{AuthError, TokenStore};
use core_library::{
    HistoryDay, HistoryRecord, Playlist, PlaylistAudios, Profile, PublicProfile, Track, Visibility,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{ApiError, Result};

/// Per-request timeout handed to the host client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Wire envelopes
// =============================================================================

#[derive(Deserialize)]
struct AudiosEnvelope {
    audios: Vec<Track>,
}

#[derive(Deserialize)]
struct PlaylistsEnvelope {
    playlists: Vec<Playlist>,
}

#[derive(Deserialize)]
struct HistoriesEnvelope {
    histories: Vec<HistoryDay>,
}

#[derive(Deserialize)]
struct RecentsEnvelope {
    recents: Vec<Track>,
}

#[derive(Deserialize)]
struct ResultEnvelope {
    result: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowingEnvelope {
    is_following: bool,
}

#[derive(Deserialize)]
struct UserEnvelope<T> {
    user: T,
}

#[derive(Deserialize)]
struct PlaylistEnvelope {
    playlist: PlaylistAudios,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistBody<'a> {
    title: &'a str,
    visibility: Visibility,
    audio_id: &'a str,
}

// =============================================================================
// Client
// =============================================================================

/// Remote API client.
///
/// Cheap to clone; all clones share the host HTTP client and token store.
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>, tokens: TokenStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer header when a token is stored.
    async fn authorize(&self, request: HttpRequest) -> Result<HttpRequest> {
        match self.tokens.load().await {
            Ok(Some(token)) => Ok(request.bearer_token(token.as_str())),
            Ok(None) => Ok(request),
            Err(AuthError::TokenCorrupted { reason }) => {
                warn!(reason = %reason, "Sending request without a session token");
                Ok(request)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, request, policy), fields(method = %request.method, path = %request.path()))]
    async fn send(&self, request: HttpRequest, policy: Option<RetryPolicy>) -> Result<HttpResponse> {
        let request = self
            .authorize(request.header("Accept", "application/json").timeout(REQUEST_TIMEOUT))
            .await?;

        let response = match policy {
            Some(policy) => self.http.execute_with_retry(request, policy).await?,
            None => self.http.execute(request).await?,
        };

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .ok()
            .and_then(|body| body.message)
            .filter(|m| !m.is_empty());
        warn!(status = response.status, "API request failed");

        Err(match response.status {
            401 | 403 => ApiError::Unauthorized {
                status: response.status,
                message,
            },
            status => ApiError::Http { status, message },
        })
    }

    /// Reads are idempotent, so they get the default backoff.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .send(HttpRequest::get(self.url(path)), Some(RetryPolicy::default()))
            .await?;
        response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(HttpRequest::post(self.url(path)), None).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Catalogue
    // -------------------------------------------------------------------------

    pub async fn latest_uploads(&self) -> Result<Vec<Track>> {
        let body: AudiosEnvelope = self.get_json("/audio/latest").await?;
        Ok(body.audios)
    }

    pub async fn recommended(&self) -> Result<Vec<Track>> {
        let body: AudiosEnvelope = self.get_json("/profile/recommended").await?;
        Ok(body.audios)
    }

    pub async fn recommended_playlists(&self) -> Result<Vec<Playlist>> {
        let body: PlaylistsEnvelope = self.get_json("/profile/auto").await?;
        Ok(body.playlists)
    }

    // -------------------------------------------------------------------------
    // Signed-in user's library
    // -------------------------------------------------------------------------

    pub async fn user_playlists(&self) -> Result<Vec<Playlist>> {
        let body: PlaylistsEnvelope = self.get_json("/playlist/profile").await?;
        Ok(body.playlists)
    }

    pub async fn user_uploads(&self) -> Result<Vec<Track>> {
        let body: AudiosEnvelope = self.get_json("/profile/audios").await?;
        Ok(body.audios)
    }

    pub async fn user_favorites(&self) -> Result<Vec<Track>> {
        let body: AudiosEnvelope = self.get_json("/favorite").await?;
        Ok(body.audios)
    }

    pub async fn is_favorite(&self, track_id: &str) -> Result<bool> {
        let path = format!("/favorite/is-fav?id={}", urlencoding::encode(track_id));
        let body: ResultEnvelope = self.get_json(&path).await?;
        Ok(body.result)
    }

    /// Flip the favorite flag server-side.
    pub async fn toggle_favorite(&self, track_id: &str) -> Result<()> {
        self.post_empty(&format!("/favorite?id={}", urlencoding::encode(track_id)))
            .await
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    pub async fn history(&self) -> Result<Vec<HistoryDay>> {
        let body: HistoriesEnvelope = self.get_json("/history").await?;
        Ok(body.histories)
    }

    pub async fn recently_played(&self) -> Result<Vec<Track>> {
        let body: RecentsEnvelope = self.get_json("/history/recent").await?;
        Ok(body.recents)
    }

    /// Append one progress record. Single attempt: a retried record would
    /// arrive after fresher ones.
    pub async fn post_history(&self, record: &HistoryRecord) -> Result<()> {
        let request = HttpRequest::post(self.url("/history")).json(record)?;
        self.send(request, Some(RetryPolicy::none())).await?;
        Ok(())
    }

    /// Remove history entries by entry id (not track id).
    pub async fn delete_histories(&self, entry_ids: &[String]) -> Result<()> {
        let ids = serde_json::to_string(entry_ids).map_err(|e| ApiError::Decode(e.to_string()))?;
        let path = format!("/history?audioIds={}", urlencoding::encode(&ids));
        self.send(HttpRequest::delete(self.url(&path)), None).await?;
        Ok(())
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.send(HttpRequest::delete(self.url("/history?all=yes")), None)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Public profiles
    // -------------------------------------------------------------------------

    pub async fn public_profile(&self, user_id: &str) -> Result<PublicProfile> {
        let body: UserEnvelope<PublicProfile> = self
            .get_json(&format!("/profile/{}", urlencoding::encode(user_id)))
            .await?;
        Ok(body.user)
    }

    pub async fn toggle_follow(&self, user_id: &str) -> Result<()> {
        self.post_empty(&format!("/profile/follower/{}", urlencoding::encode(user_id)))
            .await
    }

    pub async fn is_following(&self, user_id: &str) -> Result<bool> {
        let body: FollowingEnvelope = self
            .get_json(&format!("/profile/following/{}", urlencoding::encode(user_id)))
            .await?;
        Ok(body.is_following)
    }

    pub async fn public_uploads(&self, user_id: &str) -> Result<Vec<Track>> {
        let body: AudiosEnvelope = self
            .get_json(&format!("/profile/audios/{}", urlencoding::encode(user_id)))
            .await?;
        Ok(body.audios)
    }

    pub async fn public_playlists(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let body: PlaylistsEnvelope = self
            .get_json(&format!("/profile/playlist/{}", urlencoding::encode(user_id)))
            .await?;
        Ok(body.playlists)
    }

    // -------------------------------------------------------------------------
    // Playlists
    // -------------------------------------------------------------------------

    /// Tracks of a playlist. Private playlists have their own endpoint.
    pub async fn playlist_audios(&self, playlist_id: &str, is_private: bool) -> Result<PlaylistAudios> {
        let prefix = if is_private {
            "/profile/privatePlaylistAudios"
        } else {
            "/profile/playlistAudios"
        };
        let body: PlaylistEnvelope = self
            .get_json(&format!("{}/{}", prefix, urlencoding::encode(playlist_id)))
            .await?;
        Ok(body.playlist)
    }

    /// Create a playlist seeded with one track.
    pub async fn create_playlist(
        &self,
        track_id: &str,
        title: &str,
        visibility: Visibility,
    ) -> Result<()> {
        let request = HttpRequest::post(self.url("/playlist")).json(&PlaylistBody {
            title,
            visibility,
            audio_id: track_id,
        })?;
        self.send(request, None).await?;
        Ok(())
    }

    /// Add a track to an existing playlist, restating its title and visibility.
    pub async fn update_playlist(&self, playlist: &Playlist, track_id: &str) -> Result<()> {
        let path = format!("/playlist/{}", urlencoding::encode(&playlist.id));
        let request = HttpRequest::patch(self.url(&path)).json(&PlaylistBody {
            title: &playlist.title,
            visibility: playlist.visibility,
            audio_id: track_id,
        })?;
        self.send(request, None).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    /// Profile of the token's owner.
    pub async fn is_auth(&self) -> Result<Profile> {
        let body: UserEnvelope<Profile> = self.get_json("/auth/is-auth").await?;
        Ok(body.user)
    }

    pub async fn logout(&self, from_all: bool) -> Result<()> {
        let flag = if from_all { "yes" } else { "" };
        self.post_empty(&format!("/auth/logout?fromAll={}", flag))
            .await
    }
}
