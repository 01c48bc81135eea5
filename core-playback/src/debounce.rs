//! Single-slot trailing debouncer
//!
//! [`Debouncer::call`] replaces the pending value and restarts the timer.
//! Only the last value of a quiet window reaches the sink. Deliveries are
//! serialized and their starts are at least one window apart, including
//! deliveries forced through [`Debouncer::flush`].

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

type Sink<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

pub struct Debouncer<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    window: Duration,
    sink: Sink<T>,
    slot: Mutex<Slot<T>>,
    /// Start time of the previous delivery.
    lane: tokio::sync::Mutex<Option<Instant>>,
}

struct Slot<T> {
    pending: Option<T>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(window: Duration, sink: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                window,
                sink: Arc::new(move |value: T| sink(value).boxed()),
                slot: Mutex::new(Slot {
                    pending: None,
                    generation: 0,
                    timer: None,
                }),
                lane: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Replace the pending value and restart the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, value: T) {
        let mut slot = self.inner.slot.lock();
        slot.pending = Some(value);
        slot.generation += 1;
        let generation = slot.generation;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        let inner = Arc::clone(&self.inner);
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.window).await;
            let value = {
                let mut slot = inner.slot.lock();
                if slot.generation != generation {
                    return;
                }
                // Detach before delivering so a later call cannot abort us.
                slot.timer = None;
                slot.pending.take()
            };
            if let Some(value) = value {
                inner.deliver(value).await;
            }
        }));
        trace!(generation, "Debounce timer restarted");
    }

    /// Deliver the pending value now instead of waiting for the timer.
    ///
    /// Returns whether a value was pending.
    pub fn flush(&self) -> bool {
        let value = {
            let mut slot = self.inner.slot.lock();
            slot.generation += 1;
            if let Some(timer) = slot.timer.take() {
                timer.abort();
            }
            slot.pending.take()
        };
        match value {
            Some(value) => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move { inner.deliver(value).await });
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.inner.slot.lock().pending.is_some()
    }
}

impl<T> Inner<T> {
    async fn deliver(&self, value: T) {
        let mut last = self.lane.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.window).await;
        }
        *last = Some(Instant::now());
        (self.sink)(value).await;
    }
}
