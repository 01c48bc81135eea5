//! Service-level flows over in-memory bridges.

use bridge_traits::http::HttpMethod;
use bridge_traits::playback::EngineStatus;
use bridge_traits::testing::{FakeMediaEngine, ManualClock, MemorySecureStore, RecordingHttpClient};
use core_auth::AUTH_TOKEN_KEY;
use core_library::{HistoryAudio, HistoryDay, ListProvenance, Owner, Playlist, Profile, Track, TrackList, Visibility};
use core_playback::PlaybackError;
use core_service::{keys, CoreConfig, CoreError, CoreService};
use core_state::NotificationKind;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    http: Arc<RecordingHttpClient>,
    secrets: Arc<MemorySecureStore>,
    service: CoreService,
}

fn fixture_with(secrets: MemorySecureStore) -> Fixture {
    let http = Arc::new(RecordingHttpClient::new());
    let secrets = Arc::new(secrets);
    let config = CoreConfig::builder()
        .api_base_url("https://api.test")
        .http_client(http.clone())
        .secure_store(secrets.clone())
        .media_engine(Arc::new(FakeMediaEngine::new()))
        .clock(Arc::new(ManualClock::new(chrono::Utc::now())))
        .build()
        .unwrap();

    Fixture {
        http,
        secrets,
        service: CoreService::new(config),
    }
}

fn fixture() -> Fixture {
    fixture_with(MemorySecureStore::new())
}

fn profile() -> Profile {
    Profile {
        id: "u1".to_string(),
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        verified: true,
        avatar: None,
        followers: 3,
        followings: 1,
    }
}

fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: id.to_string(),
        url: format!("https://cdn.test/{}.mp3", id),
        poster: None,
        owner: Owner {
            id: "u2".to_string(),
            name: "Host".to_string(),
        },
        category: "Others".to_string(),
        description: None,
    }
}

// ============================================================================
// Favorites and follows
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_favorite_failure_rereads_server_truth() {
    let f = fixture();
    f.http.route(HttpMethod::Get, "/favorite/is-fav", 200, json!({ "result": false }));
    f.http.route(HttpMethod::Post, "/favorite", 500, json!({ "message": "Could not update favorite" }));

    let mut handle = f.service.queries().is_favorite("t1");
    assert_eq!(handle.settled().await.data, Some(false));

    let result = f.service.toggle_favorite("t1").await;
    assert!(matches!(result, Err(CoreError::Network(_))));
    assert!(handle.state().is_fetching);

    assert_eq!(handle.settled().await.data, Some(false));
    assert_eq!(f.http.requests_to(HttpMethod::Get, "/favorite/is-fav").len(), 2);

    let note = f.service.notifications().current();
    assert_eq!(note.message, "Could not update favorite");
    assert_eq!(note.kind, NotificationKind::Error);
}

#[tokio::test(start_paused = true)]
async fn test_favorite_flips_before_the_request_lands() {
    let f = fixture();

    f.service.toggle_favorite("t1").await.unwrap();

    // No subscriber, so the optimistic value is what readers see
    assert_eq!(
        f.service.cache().get_data::<bool>((keys::IS_FAVORITE, "t1")),
        Some(true)
    );
    assert_eq!(f.http.requests_to(HttpMethod::Post, "/favorite?id=t1").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_favorite_success_refreshes_favorites_list() {
    let f = fixture();
    f.http.route(HttpMethod::Get, "/favorite", 200, json!({ "audios": [] }));
    f.http.route(HttpMethod::Get, "/favorite/is-fav", 200, json!({ "result": true }));

    let mut favorites = f.service.queries().user_favorites();
    favorites.settled().await;

    f.service.toggle_favorite("t1").await.unwrap();
    favorites.settled().await;

    let list_fetches = f
        .http
        .requests_to(HttpMethod::Get, "/favorite")
        .into_iter()
        .filter(|r| !r.path().starts_with("/favorite/is-fav"))
        .count();
    assert_eq!(list_fetches, 2);
}

#[tokio::test(start_paused = true)]
async fn test_follow_success_refreshes_profile_and_flag() {
    let f = fixture();
    f.http.route(
        HttpMethod::Get,
        "/profile/u2",
        200,
        json!({ "user": { "id": "u2", "name": "Host", "followers": 10 } }),
    );
    f.http.route(HttpMethod::Get, "/profile/following/u2", 200, json!({ "isFollowing": true }));

    let mut public = f.service.queries().public_profile("u2");
    let mut following = f.service.queries().is_following("u2");
    public.settled().await;
    following.settled().await;

    f.service.toggle_follow("u2").await.unwrap();
    public.settled().await;
    following.settled().await;

    assert_eq!(f.http.requests_to(HttpMethod::Get, "/profile/u2").len(), 2);
    assert_eq!(f.http.requests_to(HttpMethod::Get, "/profile/following/u2").len(), 2);
    assert_eq!(f.http.requests_to(HttpMethod::Post, "/profile/follower/u2").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_ids_disable_queries() {
    let f = fixture();
    let handle = f.service.queries().public_profile("");
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(handle.state().data.is_none());
    assert!(f.http.requests().is_empty());
}

// ============================================================================
// History and playlists
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_remove_histories_drops_entries_then_refetches() {
    let f = fixture();
    f.http.route(
        HttpMethod::Get,
        "/history",
        200,
        json!({ "histories": [
            { "date": "2024-05-01", "audios": [
                { "id": "h1", "audioId": "t1", "date": "2024-05-01T10:00:00Z", "title": "One" }
            ]},
            { "date": "2024-04-30", "audios": [
                { "id": "h2", "audioId": "t2", "date": "2024-04-30T10:00:00Z", "title": "Two" }
            ]}
        ]}),
    );

    let seeded = vec![HistoryDay {
        date: "2024-05-01".to_string(),
        audios: vec![HistoryAudio {
            id: "h1".to_string(),
            audio_id: "t1".to_string(),
            date: "2024-05-01T10:00:00Z".to_string(),
            title: "One".to_string(),
        }],
    }];
    f.service
        .cache()
        .set_data(keys::USER_HISTORY, |_: Option<Vec<HistoryDay>>| seeded.clone());

    f.service.remove_histories(&["h1".to_string()]).await.unwrap();

    let deletes = f.http.requests_to(HttpMethod::Delete, "/history?audioIds=");
    assert_eq!(deletes.len(), 1);
    assert!(deletes[0].path().contains("%5B%22h1%22%5D"));
    // Optimistic removal left no days behind
    assert_eq!(
        f.service.cache().get_data::<Vec<HistoryDay>>(keys::USER_HISTORY),
        Some(Vec::new())
    );
}

#[tokio::test(start_paused = true)]
async fn test_clear_history_confirms_with_success_message() {
    let f = fixture();
    f.service.clear_history().await.unwrap();

    assert_eq!(f.http.requests_to(HttpMethod::Delete, "/history?all=yes").len(), 1);
    let note = f.service.notifications().current();
    assert_eq!(note.message, "History is cleared");
    assert_eq!(note.kind, NotificationKind::Success);

    tokio::time::sleep(Duration::from_millis(3001)).await;
    assert!(!f.service.notifications().current().is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_blank_playlist_title_is_rejected_locally() {
    let f = fixture();
    let result = f.service.create_playlist("t1", "   ", Visibility::Public).await;

    assert!(matches!(result, Err(CoreError::Validation(_))));
    assert!(f.http.requests().is_empty());
    assert_eq!(f.service.notifications().current().message, "Title is missing!");
}

#[tokio::test(start_paused = true)]
async fn test_playlist_create_and_update() {
    let f = fixture();

    f.service
        .create_playlist("t1", "Morning", Visibility::Private)
        .await
        .unwrap();
    let created = f.http.requests_to(HttpMethod::Post, "/playlist");
    assert_eq!(created.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(created[0].body.as_ref().unwrap()).unwrap();
    assert_eq!(body, json!({ "title": "Morning", "visibility": "private", "audioId": "t1" }));
    assert_eq!(f.service.notifications().current().message, "Playlist successfully created");

    let playlist = Playlist {
        id: "p1".to_string(),
        title: "Morning".to_string(),
        visibility: Visibility::Private,
        count: 1,
    };
    f.service.add_to_playlist(&playlist, "t2").await.unwrap();
    assert_eq!(f.http.requests_to(HttpMethod::Patch, "/playlist/p1").len(), 1);
    assert_eq!(f.service.notifications().current().message, "Playlist successfully updated");
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_restore_session_with_stored_token() {
    let f = fixture_with(MemorySecureStore::with_secret(AUTH_TOKEN_KEY, "tok-1"));
    f.http.route(
        HttpMethod::Get,
        "/auth/is-auth",
        200,
        json!({ "user": {
            "id": "u1", "name": "Ana", "email": "ana@example.com",
            "verified": true, "followers": 3, "followings": 1
        }}),
    );

    assert!(f.service.restore_session().await.unwrap());

    let auth = f.service.store().auth.get();
    assert!(auth.is_logged_in);
    assert!(!auth.is_busy);
    assert_eq!(auth.profile.as_ref(), Some(&profile()));

    let request = &f.http.requests_to(HttpMethod::Get, "/auth/is-auth")[0];
    assert_eq!(
        request.headers.get("Authorization").map(String::as_str),
        Some("Bearer tok-1")
    );
}

#[tokio::test(start_paused = true)]
async fn test_restore_session_without_token_skips_network() {
    let f = fixture();
    assert!(!f.service.restore_session().await.unwrap());
    assert!(f.http.requests().is_empty());
    assert!(!f.service.store().auth.get().is_busy);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_then_logout() {
    let f = fixture();
    f.service.sign_in_with_token("tok-2", profile()).await.unwrap();
    assert!(f.secrets.contains(AUTH_TOKEN_KEY));
    assert!(f.service.store().auth.get().is_logged_in);

    f.service.logout(true).await.unwrap();

    assert_eq!(f.http.requests_to(HttpMethod::Post, "/auth/logout?fromAll=yes").len(), 1);
    assert!(!f.secrets.contains(AUTH_TOKEN_KEY));
    let auth = f.service.store().auth.get();
    assert!(!auth.is_logged_in);
    assert!(auth.profile.is_none());
    assert!(!auth.is_busy);
}

#[tokio::test(start_paused = true)]
async fn test_logout_clears_player() {
    let f = fixture();
    f.service.sign_in_with_token("tok-2", profile()).await.unwrap();
    let list = TrackList::new(vec![track("t1"), track("t2")], ListProvenance::Latest);
    f.service.play_track_from_list(&track("t1"), &list).await.unwrap();
    assert_eq!(f.service.controller().status(), EngineStatus::Playing);

    f.service.logout(false).await.unwrap();

    let player = f.service.store().player.get();
    assert!(player.current_track_id().is_none());
    assert!(player.current_list.is_empty());
    assert_eq!(f.service.controller().status(), EngineStatus::None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_logout_keeps_session() {
    let f = fixture();
    f.service.sign_in_with_token("tok-2", profile()).await.unwrap();
    f.http.fail(HttpMethod::Post, "/auth/logout", "offline");

    assert!(f.service.logout(false).await.is_err());

    assert!(f.secrets.contains(AUTH_TOKEN_KEY));
    assert!(f.service.store().auth.get().is_logged_in);
    assert!(f.service.notifications().current().is_visible());
}

// ============================================================================
// Playback surface and modal
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unsupported_rate_is_silent() {
    let f = fixture();
    let result = f.service.set_rate(2.5).await;

    assert!(matches!(
        result,
        Err(CoreError::Playback(PlaybackError::UnsupportedRate(_)))
    ));
    assert!(!f.service.notifications().current().is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_playback_errors_are_notified() {
    let f = fixture();
    let list = TrackList::new(vec![track("t1")], ListProvenance::Latest);

    let result = f.service.play_track_from_list(&track("t9"), &list).await;

    assert!(result.is_err());
    assert!(f.service.notifications().current().is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_service_plays_and_starts_telemetry_once() {
    let f = fixture();
    assert!(f.service.start());
    assert!(!f.service.start());

    let list = TrackList::new(vec![track("t1"), track("t2")], ListProvenance::Latest);
    f.service.play_track_from_list(&track("t2"), &list).await.unwrap();

    let player = f.service.store().player.get();
    assert_eq!(player.current_track_id(), Some("t2"));
    f.service.shutdown();
}

#[tokio::test]
async fn test_playlist_modal_open_and_close() {
    let f = fixture();

    f.service.open_playlist_modal("p1", true);
    let modal = f.service.playlist_modal();
    assert!(modal.visible);
    assert_eq!(modal.selected_list_id.as_deref(), Some("p1"));
    assert_eq!(modal.is_private, Some(true));

    f.service.close_playlist_modal();
    assert!(!f.service.playlist_modal().visible);
}
