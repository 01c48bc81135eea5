//! In-memory bridge fakes.
//!
//! Available to this crate's tests and, through the `test-support` feature,
//! to downstream crates' tests. The fakes record every call so tests can
//! assert on command order rather than on mocked return values alone.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::{broadcast, watch};

use crate::error::{BridgeError, Result};
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::playback::{EngineEvent, EngineItem, EngineOptions, EngineStatus, MediaEngine};
use crate::storage::SecureStore;
use crate::time::Clock;

// ============================================================================
// Media engine
// ============================================================================

/// Commands observed by [`FakeMediaEngine`], in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Setup,
    UpdateOptions,
    Add(Vec<String>),
    Reset,
    Skip(usize),
    SkipToNext,
    SkipToPrevious,
    Play,
    Pause,
    SeekTo(f64),
    SetRate(f32),
}

#[derive(Default)]
struct FakeEngineState {
    set_up: bool,
    options: Option<EngineOptions>,
    queue: Vec<EngineItem>,
    current: Option<usize>,
    position: f64,
    duration: f64,
    rate: f32,
    commands: Vec<EngineCommand>,
    fail_next: Option<String>,
}

/// Queue-accurate stand-in for a native player.
///
/// Status transitions follow the common mobile player semantics: adding to an
/// empty queue makes the engine `Ready`, `play` moves to `Playing`, `pause`
/// to `Paused`, `reset` back to `None`.
pub struct FakeMediaEngine {
    state: Mutex<FakeEngineState>,
    status: watch::Sender<EngineStatus>,
    events: broadcast::Sender<EngineEvent>,
}

impl FakeMediaEngine {
    pub fn new() -> Self {
        let (status, _) = watch::channel(EngineStatus::None);
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(FakeEngineState {
                rate: 1.0,
                duration: 300.0,
                ..FakeEngineState::default()
            }),
            status,
            events,
        }
    }

    /// Every command received so far.
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.state.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// How many times `setup_player` was invoked.
    pub fn setup_calls(&self) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|c| matches!(c, EngineCommand::Setup))
            .count()
    }

    pub fn options(&self) -> Option<EngineOptions> {
        self.state.lock().options.clone()
    }

    pub fn queue_ids(&self) -> Vec<String> {
        self.state.lock().queue.iter().map(|i| i.id.clone()).collect()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.lock().current
    }

    pub fn current_id(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .current
            .and_then(|i| state.queue.get(i))
            .map(|item| item.id.clone())
    }

    pub fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    pub fn set_position(&self, seconds: f64) {
        self.state.lock().position = seconds;
    }

    pub fn set_duration(&self, seconds: f64) {
        self.state.lock().duration = seconds;
    }

    /// Force a status, e.g. to simulate buffering.
    pub fn set_status(&self, status: EngineStatus) {
        self.status.send_replace(status);
    }

    /// Move the current index as if the engine advanced on its own.
    pub fn advance_to(&self, index: usize) {
        self.state.lock().current = Some(index);
    }

    /// The next command fails with `message` instead of taking effect.
    pub fn fail_next_command(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Push an event to subscribers.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    fn command(&self, command: EngineCommand) -> Result<parking_lot::MutexGuard<'_, FakeEngineState>> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(BridgeError::Rejected(message));
        }
        if !state.set_up && !matches!(command, EngineCommand::Setup) {
            return Err(BridgeError::NotAvailable(
                "The player is not initialized. Call setup_player first.".to_string(),
            ));
        }
        state.commands.push(command);
        Ok(state)
    }
}

impl Default for FakeMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEngine for FakeMediaEngine {
    async fn setup_player(&self) -> Result<()> {
        let mut state = self.command(EngineCommand::Setup)?;
        if state.set_up {
            return Err(BridgeError::Rejected(
                "The player has already been initialized via setup_player".to_string(),
            ));
        }
        state.set_up = true;
        Ok(())
    }

    async fn update_options(&self, options: EngineOptions) -> Result<()> {
        let mut state = self.command(EngineCommand::UpdateOptions)?;
        state.options = Some(options);
        Ok(())
    }

    async fn add(&self, items: Vec<EngineItem>) -> Result<()> {
        let ids = items.iter().map(|i| i.id.clone()).collect();
        let mut state = self.command(EngineCommand::Add(ids))?;
        state.queue.extend(items);
        if state.current.is_none() && !state.queue.is_empty() {
            state.current = Some(0);
            state.position = 0.0;
            drop(state);
            if !self.status.borrow().is_ready() {
                self.status.send_replace(EngineStatus::Ready);
            }
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.command(EngineCommand::Reset)?;
        state.queue.clear();
        state.current = None;
        state.position = 0.0;
        drop(state);
        self.status.send_replace(EngineStatus::None);
        Ok(())
    }

    async fn skip(&self, index: usize) -> Result<()> {
        let mut state = self.command(EngineCommand::Skip(index))?;
        if index >= state.queue.len() {
            return Err(BridgeError::Rejected(format!("Index {} out of bounds", index)));
        }
        state.current = Some(index);
        state.position = 0.0;
        Ok(())
    }

    async fn skip_to_next(&self) -> Result<()> {
        let mut state = self.command(EngineCommand::SkipToNext)?;
        match state.current {
            Some(i) if i + 1 < state.queue.len() => {
                state.current = Some(i + 1);
                state.position = 0.0;
                Ok(())
            }
            _ => Err(BridgeError::Rejected("No next track".to_string())),
        }
    }

    async fn skip_to_previous(&self) -> Result<()> {
        let mut state = self.command(EngineCommand::SkipToPrevious)?;
        match state.current {
            Some(i) if i > 0 => {
                state.current = Some(i - 1);
                state.position = 0.0;
                Ok(())
            }
            _ => Err(BridgeError::Rejected("No previous track".to_string())),
        }
    }

    async fn play(&self) -> Result<()> {
        let state = self.command(EngineCommand::Play)?;
        let has_track = state.current.is_some();
        drop(state);
        if has_track {
            self.status.send_replace(EngineStatus::Playing);
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let state = self.command(EngineCommand::Pause)?;
        let has_track = state.current.is_some();
        drop(state);
        if has_track {
            self.status.send_replace(EngineStatus::Paused);
        }
        Ok(())
    }

    async fn seek_to(&self, seconds: f64) -> Result<()> {
        let mut state = self.command(EngineCommand::SeekTo(seconds))?;
        state.position = seconds;
        Ok(())
    }

    async fn set_rate(&self, rate: f32) -> Result<()> {
        let mut state = self.command(EngineCommand::SetRate(rate))?;
        state.rate = rate;
        Ok(())
    }

    async fn get_queue(&self) -> Result<Vec<EngineItem>> {
        Ok(self.state.lock().queue.clone())
    }

    async fn get_current_track(&self) -> Result<Option<usize>> {
        Ok(self.state.lock().current)
    }

    async fn get_position(&self) -> Result<f64> {
        Ok(self.state.lock().position)
    }

    async fn get_duration(&self) -> Result<f64> {
        Ok(self.state.lock().duration)
    }

    fn watch_status(&self) -> watch::Receiver<EngineStatus> {
        self.status.subscribe()
    }

    fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Secure store
// ============================================================================

/// Map-backed [`SecureStore`].
#[derive(Default)]
pub struct MemorySecureStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .secrets
            .lock()
            .insert(key.to_string(), value.as_bytes().to_vec());
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.secrets.lock().contains_key(key)
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.secrets.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.secrets.lock().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.secrets.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// HTTP client
// ============================================================================

struct Route {
    method: HttpMethod,
    path: String,
    response: std::result::Result<(u16, Bytes), String>,
}

/// [`HttpClient`] that answers from a route table and records requests.
///
/// Routes match on method plus a path prefix (compared against
/// [`HttpRequest::path`]); the most recently added route wins. Unmatched
/// requests get `200 {}`.
#[derive(Default)]
pub struct RecordingHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path*` with `status` and a JSON body.
    pub fn route(&self, method: HttpMethod, path: &str, status: u16, body: serde_json::Value) {
        self.routes.lock().insert(
            0,
            Route {
                method,
                path: path.to_string(),
                response: Ok((status, Bytes::from(body.to_string()))),
            },
        );
    }

    /// Fail `method path*` at the transport level.
    pub fn fail(&self, method: HttpMethod, path: &str, message: &str) {
        self.routes.lock().insert(
            0,
            Route {
                method,
                path: path.to_string(),
                response: Err(message.to_string()),
            },
        );
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose method matches and whose path starts with `path`.
    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path().starts_with(path))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let answer = {
            let routes = self.routes.lock();
            routes
                .iter()
                .find(|route| route.method == request.method && request.path().starts_with(&route.path))
                .map(|route| route.response.clone())
        };
        self.requests.lock().push(request);

        match answer {
            Some(Ok((status, body))) => Ok(HttpResponse::new(status, body)),
            Some(Err(message)) => Err(BridgeError::OperationFailed(message)),
            None => Ok(HttpResponse::new(200, "{}")),
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock frozen at a settable instant.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
