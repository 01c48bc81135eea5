//! Server cache implementation

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::key::QueryKey;

/// Error produced by a fetcher. Shared between every reader of the entry.
pub type FetchError = Arc<dyn std::error::Error + Send + Sync>;

type AnyValue = Arc<dyn Any + Send + Sync>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyValue, FetchError>> + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&QueryKey, &FetchError) + Send + Sync>;

// ============================================================================
// Entries
// ============================================================================

enum Slot {
    Idle,
    Fetching { previous: Option<AnyValue> },
    Fresh(AnyValue),
    Stale(AnyValue),
    Failed {
        error: FetchError,
        previous: Option<AnyValue>,
    },
}

impl Slot {
    fn value(&self) -> Option<&AnyValue> {
        match self {
            Slot::Idle => None,
            Slot::Fresh(v) | Slot::Stale(v) => Some(v),
            Slot::Fetching { previous } | Slot::Failed { previous, .. } => previous.as_ref(),
        }
    }

    fn into_value(self) -> Option<AnyValue> {
        match self {
            Slot::Idle => None,
            Slot::Fresh(v) | Slot::Stale(v) => Some(v),
            Slot::Fetching { previous } | Slot::Failed { previous, .. } => previous,
        }
    }

    fn is_fetching(&self) -> bool {
        matches!(self, Slot::Fetching { .. })
    }

    fn needs_fetch(&self) -> bool {
        matches!(self, Slot::Idle | Slot::Stale(_) | Slot::Failed { .. })
    }

    fn error(&self) -> Option<&FetchError> {
        match self {
            Slot::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Slot::Idle => "idle",
            Slot::Fetching { .. } => "fetching",
            Slot::Fresh(_) => "fresh",
            Slot::Stale(_) => "stale",
            Slot::Failed { .. } => "failed",
        }
    }
}

struct Entry {
    slot: Slot,
    /// Optimistic value shown in place of the slot's value.
    overlay: Option<AnyValue>,
    fetcher: Option<Fetcher>,
    /// Live enabled subscriptions.
    active: usize,
    /// Invalidated while a fetch was in flight.
    refetch_pending: bool,
    version: watch::Sender<u64>,
}

impl Entry {
    fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            slot: Slot::Idle,
            overlay: None,
            fetcher: None,
            active: 0,
            refetch_pending: false,
            version,
        }
    }

    fn data(&self) -> Option<&AnyValue> {
        self.overlay.as_ref().or_else(|| self.slot.value())
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, value: &AnyValue) -> Option<T> {
    let typed = (**value).downcast_ref::<T>().cloned();
    if typed.is_none() {
        warn!(key = %key, "Cached value has a different type than requested");
    }
    typed
}

// ============================================================================
// Shared state
// ============================================================================

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    error_hook: RwLock<Option<ErrorHook>>,
}

impl Inner {
    /// Start a fetch for `entry` unless one is already running.
    fn begin_fetch(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) {
        let Some(fetcher) = entry.fetcher.clone() else {
            return;
        };
        if entry.slot.is_fetching() {
            entry.refetch_pending = true;
            return;
        }

        debug!(key = %key, from = entry.slot.name(), "Fetching");
        let previous = std::mem::replace(&mut entry.slot, Slot::Idle).into_value();
        entry.slot = Slot::Fetching { previous };
        entry.notify();

        let inner = Arc::clone(self);
        let key = key.clone();
        tokio::spawn(async move {
            let result = fetcher().await;
            inner.complete_fetch(&key, result);
        });
    }

    fn complete_fetch(self: &Arc<Self>, key: &QueryKey, result: Result<AnyValue, FetchError>) {
        let failure = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            let previous = std::mem::replace(&mut entry.slot, Slot::Idle).into_value();

            if entry.refetch_pending {
                // The result predates the invalidation. Refetch for live
                // subscribers; otherwise keep it as stale for the next one.
                entry.refetch_pending = false;
                if entry.active > 0 {
                    entry.slot = match previous {
                        Some(v) => Slot::Stale(v),
                        None => Slot::Idle,
                    };
                    self.begin_fetch(key, entry);
                } else {
                    entry.slot = match result.ok().or(previous) {
                        Some(v) => Slot::Stale(v),
                        None => Slot::Idle,
                    };
                    debug!(key = %key, "Fetch outlived its invalidation; kept as stale");
                    entry.notify();
                }
                return;
            }

            let failure = match result {
                Ok(value) => {
                    debug!(key = %key, "Fetch succeeded");
                    entry.slot = Slot::Fresh(value);
                    entry.overlay = None;
                    None
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "Fetch failed");
                    entry.slot = Slot::Failed {
                        error: Arc::clone(&error),
                        previous,
                    };
                    Some(error)
                }
            };
            entry.notify();
            failure
        };

        if let Some(error) = failure {
            let hook = self.error_hook.read().clone();
            if let Some(hook) = hook {
                hook(key, &error);
            }
        }
    }
}

// ============================================================================
// Public surface
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// A disabled subscription neither fetches nor counts as live.
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl QueryOptions {
    pub fn enabled(enabled: bool) -> Self {
        Self { enabled }
    }
}

/// Snapshot of an entry as seen by one subscriber.
#[derive(Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    /// Fetching with nothing to show yet.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<FetchError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_fetching: false,
            error: None,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryState")
            .field("data", &self.data)
            .field("is_loading", &self.is_loading)
            .field("is_fetching", &self.is_fetching)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

/// A live subscription to one entry. Dropping it withdraws the subscription;
/// a fetch already running still completes.
pub struct QueryHandle<T> {
    inner: Arc<Inner>,
    key: QueryKey,
    rx: watch::Receiver<u64>,
    enabled: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + Sync + 'static> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> QueryState<T> {
        let entries = self.inner.entries.lock();
        let Some(entry) = entries.get(&self.key) else {
            return QueryState::default();
        };
        let data = entry.data().and_then(|v| downcast::<T>(&self.key, v));
        let is_fetching = entry.slot.is_fetching();
        QueryState {
            is_loading: is_fetching && data.is_none(),
            is_fetching,
            data,
            error: entry.slot.error().cloned(),
        }
    }

    /// Wait for the next change to the entry.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update();
        Some(self.state())
    }

    /// Wait until no fetch is running and return the state.
    pub async fn settled(&mut self) -> QueryState<T> {
        loop {
            self.rx.borrow_and_update();
            let state = self.state();
            if !state.is_fetching || self.rx.changed().await.is_err() {
                return state;
            }
        }
    }
}

impl<T> Drop for QueryHandle<T> {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(entry) = self.inner.entries.lock().get_mut(&self.key) {
            entry.active = entry.active.saturating_sub(1);
        }
    }
}

/// Keyed cache of server reads.
///
/// Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct ServerCache {
    inner: Arc<Inner>,
}

impl Default for ServerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                error_hook: RwLock::new(None),
            }),
        }
    }

    /// Called after every failed fetch, outside the cache lock.
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&QueryKey, &FetchError) + Send + Sync + 'static,
    {
        *self.inner.error_hook.write() = Some(Arc::new(hook));
    }

    /// Subscribe to `key`.
    ///
    /// An enabled subscription fetches when the entry has nothing fresh and
    /// no fetch is running; otherwise it shares what is there. The most
    /// recent enabled subscription's `fetcher` is the one used for refetches.
    pub fn use_entry<T, E, F, Fut>(
        &self,
        key: impl Into<QueryKey>,
        fetcher: F,
        options: QueryOptions,
    ) -> QueryHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let key = key.into();
        let rx = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(Entry::new);

            if options.enabled {
                let erased: Fetcher = Arc::new(move || {
                    let fut = fetcher();
                    async move {
                        fut.await
                            .map(|v| Arc::new(v) as AnyValue)
                            .map_err(|e| Arc::new(e) as FetchError)
                    }
                    .boxed()
                });
                entry.fetcher = Some(erased);
                entry.active += 1;
                if entry.slot.needs_fetch() {
                    self.inner.begin_fetch(&key, entry);
                }
            }
            // Subscribed last so the handle starts at the current version.
            entry.version.subscribe()
        };

        QueryHandle {
            inner: Arc::clone(&self.inner),
            key,
            rx,
            enabled: options.enabled,
            _marker: PhantomData,
        }
    }

    /// Mark every entry under `prefix` stale and refetch those with live
    /// subscribers. Returns the number of matching entries.
    pub fn invalidate(&self, prefix: impl Into<QueryKey>) -> usize {
        let prefix = prefix.into();
        let mut entries = self.inner.entries.lock();
        let mut matched = 0;

        for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(&prefix)) {
            matched += 1;
            entry.slot = match std::mem::replace(&mut entry.slot, Slot::Idle) {
                Slot::Fresh(v) => Slot::Stale(v),
                other => other,
            };
            if entry.active > 0 {
                self.inner.begin_fetch(key, entry);
            } else {
                if entry.slot.is_fetching() {
                    entry.refetch_pending = true;
                }
                entry.notify();
            }
        }

        debug!(prefix = %prefix, matched, "Invalidated");
        matched
    }

    /// Overwrite what readers of `key` see. `updater` gets the current value.
    pub fn set_data<T, F>(&self, key: impl Into<QueryKey>, updater: F)
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Option<T>) -> T,
    {
        let key = key.into();
        let prior = self.get_data::<T>(&key);
        let next = updater(prior);

        let mut entries = self.inner.entries.lock();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.overlay = Some(Arc::new(next));
        entry.notify();
        debug!(key = %key, "Optimistic value set");
    }

    pub fn get_data<T: Clone + Send + Sync + 'static>(&self, key: impl Into<QueryKey>) -> Option<T> {
        let key = key.into();
        let entries = self.inner.entries.lock();
        entries
            .get(&key)
            .and_then(Entry::data)
            .and_then(|v| downcast::<T>(&key, v))
    }

    /// Run `on_mutate` synchronously, then await `mutation_fn`.
    ///
    /// Nothing is rolled back or invalidated here; `mutation_fn` and the
    /// caller own that.
    pub async fn mutate<A, R, E, M, Fut>(
        &self,
        args: A,
        on_mutate: impl FnOnce(&ServerCache, &A),
        mutation_fn: M,
    ) -> Result<R, E>
    where
        M: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: std::fmt::Display,
    {
        on_mutate(self, &args);
        let result = mutation_fn(args).await;
        if let Err(e) = &result {
            debug!(error = %e, "Mutation failed");
        }
        result
    }

    /// Live enabled subscriptions on `key`.
    pub fn subscriber_count(&self, key: impl Into<QueryKey>) -> usize {
        self.inner
            .entries
            .lock()
            .get(&key.into())
            .map_or(0, |e| e.active)
    }
}
