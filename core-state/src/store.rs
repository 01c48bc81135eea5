//! Slice stores and selections

use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

use crate::slices::auth::AuthSlice;
use crate::slices::notification::NotificationSlice;
use crate::slices::player::PlayerSlice;
use crate::slices::playlist_modal::PlaylistModalSlice;

/// A named region of client state with a pure, total reducer.
pub trait Slice: Send + Sync + 'static {
    /// Name used in logs.
    const NAME: &'static str;

    type State: Clone + PartialEq + Debug + Default + Send + Sync + 'static;
    type Action: Debug + Send;

    /// Apply `action` to `state` in place. Must not fail or block.
    fn reduce(state: &mut Self::State, action: Self::Action);
}

/// Owner of one slice's current value.
///
/// Clones share the same value and subscribers.
pub struct SliceStore<S: Slice> {
    tx: Arc<watch::Sender<Arc<S::State>>>,
}

impl<S: Slice> Clone for SliceStore<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S: Slice> Default for SliceStore<S> {
    fn default() -> Self {
        Self::new(S::State::default())
    }
}

impl<S: Slice> SliceStore<S> {
    pub fn new(initial: S::State) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Current value.
    pub fn get(&self) -> Arc<S::State> {
        Arc::clone(&self.tx.borrow())
    }

    /// Run the reducer. Returns whether the value changed; subscribers are
    /// only notified when it did.
    pub fn dispatch(&self, action: S::Action) -> bool {
        trace!(slice = S::NAME, action = ?action, "Dispatching");
        self.tx.send_if_modified(|current| {
            let mut next = (**current).clone();
            S::reduce(&mut next, action);
            if next == **current {
                return false;
            }
            *current = Arc::new(next);
            true
        })
    }

    /// Receiver woken after every effective transition.
    pub fn subscribe(&self) -> watch::Receiver<Arc<S::State>> {
        self.tx.subscribe()
    }

    /// Subscribe to a projection of the state.
    pub fn select<T, F>(&self, projection: F) -> Selection<S, T>
    where
        T: Clone + PartialEq + Send + Sync,
        F: Fn(&S::State) -> T + Send + Sync + 'static,
    {
        let mut rx = self.tx.subscribe();
        let last = projection(&**rx.borrow_and_update());
        Selection {
            rx,
            projection: Box::new(projection),
            last,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A subscription that fires only when the selected value changes.
pub struct Selection<S: Slice, T> {
    rx: watch::Receiver<Arc<S::State>>,
    projection: Box<dyn Fn(&S::State) -> T + Send + Sync>,
    last: T,
}

impl<S: Slice, T: Clone + PartialEq> Selection<S, T> {
    /// Last value observed by this selection.
    pub fn get(&self) -> &T {
        &self.last
    }

    /// Wait for the projection to produce a different value.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            self.rx.changed().await.ok()?;
            let next = (self.projection)(&**self.rx.borrow_and_update());
            if next != self.last {
                self.last = next.clone();
                return Some(next);
            }
        }
    }
}

/// The four client slices.
#[derive(Clone, Default)]
pub struct AppStore {
    pub auth: SliceStore<AuthSlice>,
    pub notification: SliceStore<NotificationSlice>,
    pub player: SliceStore<PlayerSlice>,
    pub playlist_modal: SliceStore<PlaylistModalSlice>,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }
}
