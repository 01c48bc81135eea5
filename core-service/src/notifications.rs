//! Notification coordinator
//!
//! One message at a time, last writer wins. Every [`notify`] restarts the
//! dismissal timer, so the visible message always disappears a full timeout
//! after it was shown.
//!
//! [`notify`]: NotificationCoordinator::notify

use core_runtime::events::{CoreEvent, EventBus, NotificationEvent};
use core_state::{NotificationAction, NotificationKind, NotificationSlice, NotificationState, SliceStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::CoreError;

#[derive(Default)]
struct DismissTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl DismissTimer {
    /// Invalidate the running timer, if any.
    fn cancel(&mut self) -> u64 {
        self.generation += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation
    }
}

#[derive(Clone)]
pub struct NotificationCoordinator {
    slice: SliceStore<NotificationSlice>,
    events: EventBus,
    timeout: Duration,
    timer: Arc<Mutex<DismissTimer>>,
}

impl NotificationCoordinator {
    pub fn new(slice: SliceStore<NotificationSlice>, events: EventBus, timeout: Duration) -> Self {
        Self {
            slice,
            events,
            timeout,
            timer: Arc::new(Mutex::new(DismissTimer::default())),
        }
    }

    /// Show `message`, replacing whatever is visible, and schedule its
    /// dismissal. An empty message dismisses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        if message.is_empty() {
            self.dismiss();
            return;
        }

        let mut timer = self.timer.lock();
        let generation = timer.cancel();

        debug!(%kind, %message, "Showing notification");
        self.slice.dispatch(NotificationAction::Show {
            message: message.clone(),
            kind,
        });
        self.events
            .emit(CoreEvent::Notification(NotificationEvent::Shown {
                kind: kind.to_string(),
                message,
            }))
            .ok();

        let coordinator = self.clone();
        timer.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(coordinator.timeout).await;
            let mut timer = coordinator.timer.lock();
            if timer.generation != generation {
                return;
            }
            timer.handle = None;
            coordinator.clear();
        }));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(message, NotificationKind::Error);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(message, NotificationKind::Success);
    }

    /// Surface `error` unless it is silent.
    pub fn report(&self, error: &CoreError) {
        if error.is_silent() {
            debug!(error = %error, "Silent error, not notifying");
            return;
        }
        self.error(error.user_message());
    }

    /// Clear the message now and cancel the pending dismissal.
    pub fn dismiss(&self) {
        let mut timer = self.timer.lock();
        timer.cancel();
        self.clear();
    }

    pub fn current(&self) -> Arc<NotificationState> {
        self.slice.get()
    }

    fn clear(&self) {
        if self.slice.dispatch(NotificationAction::Clear) {
            self.events
                .emit(CoreEvent::Notification(NotificationEvent::Dismissed))
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn coordinator() -> (NotificationCoordinator, EventBus) {
        let events = EventBus::new(16);
        let coordinator = NotificationCoordinator::new(
            SliceStore::default(),
            events.clone(),
            Duration::from_millis(3000),
        );
        (coordinator, events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_is_dismissed_after_timeout() {
        let (coordinator, _events) = coordinator();

        coordinator.success("Playlist successfully created");
        assert!(coordinator.current().is_visible());
        assert_eq!(coordinator.current().kind, NotificationKind::Success);

        sleep(Duration::from_millis(2999)).await;
        assert!(coordinator.current().is_visible());

        sleep(Duration::from_millis(2)).await;
        assert!(!coordinator.current().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_message_restarts_window() {
        let (coordinator, events) = coordinator();
        let mut rx = events.subscribe();

        coordinator.error("first");
        sleep(Duration::from_millis(2000)).await;
        coordinator.error("second");
        assert_eq!(coordinator.current().message, "second");

        // The first timer would have fired here
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(coordinator.current().message, "second");

        sleep(Duration::from_millis(1501)).await;
        assert!(!coordinator.current().is_visible());

        let mut dismissals = 0;
        while let Ok(event) = rx.try_recv() {
            if event == CoreEvent::Notification(NotificationEvent::Dismissed) {
                dismissals += 1;
            }
        }
        assert_eq!(dismissals, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_timer() {
        let (coordinator, events) = coordinator();
        coordinator.error("boom");
        coordinator.dismiss();
        assert!(!coordinator.current().is_visible());

        let mut rx = events.subscribe();
        coordinator.error("again");
        sleep(Duration::from_millis(3001)).await;
        assert!(!coordinator.current().is_visible());
        // Shown + one Dismissed
        let received: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(received.len(), 2);
    }

    #[tokio::test]
    async fn test_silent_errors_are_not_shown() {
        let (coordinator, _events) = coordinator();
        coordinator.report(&CoreError::Cancelled);
        assert!(!coordinator.current().is_visible());

        coordinator.report(&CoreError::Validation("Title is missing!".into()));
        assert_eq!(coordinator.current().message, "Title is missing!");
    }
}
