//! Single transient message.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::Slice;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Error,
    Success,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Error => "error",
            NotificationKind::Success => "success",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An empty message means nothing is visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub message: String,
    pub kind: NotificationKind,
}

impl NotificationState {
    pub fn is_visible(&self) -> bool {
        !self.message.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum NotificationAction {
    Show {
        message: String,
        kind: NotificationKind,
    },
    Clear,
}

pub struct NotificationSlice;

impl Slice for NotificationSlice {
    const NAME: &'static str = "notification";
    type State = NotificationState;
    type Action = NotificationAction;

    fn reduce(state: &mut NotificationState, action: NotificationAction) {
        match action {
            NotificationAction::Show { message, kind } => {
                state.message = message;
                state.kind = kind;
            }
            NotificationAction::Clear => state.message.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SliceStore;

    #[test]
    fn test_show_then_clear() {
        let store = SliceStore::<NotificationSlice>::default();
        assert!(!store.get().is_visible());

        store.dispatch(NotificationAction::Show {
            message: "Playlist successfully created".to_string(),
            kind: NotificationKind::Success,
        });
        assert!(store.get().is_visible());
        assert_eq!(store.get().kind, NotificationKind::Success);

        store.dispatch(NotificationAction::Clear);
        assert!(!store.get().is_visible());
    }

    #[test]
    fn test_last_writer_wins() {
        let store = SliceStore::<NotificationSlice>::default();
        for message in ["first", "second"] {
            store.dispatch(NotificationAction::Show {
                message: message.to_string(),
                kind: NotificationKind::Error,
            });
        }
        assert_eq!(store.get().message, "second");
    }
}
