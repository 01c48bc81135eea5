//! # Observable Client State
//!
//! Process-wide named slices read by UI consumers.
//!
//! ## Overview
//!
//! Each slice is a value type plus a pure reducer ([`Slice`]). A
//! [`SliceStore`] owns the current value behind a `tokio::sync::watch`
//! channel: dispatching an action produces a fresh value and subscribers are
//! woken only when the value actually changed. [`SliceStore::select`] narrows
//! that further to a projection.
//!
//! Reducers never read another slice. Cross-slice coordination (for example
//! clearing the player when signing out) belongs to the service layer.
//!
//! ## Slices
//!
//! | Name | State | Purpose |
//! |------|-------|---------|
//! | `auth` | [`AuthState`] | Signed-in profile, logged-in and busy flags |
//! | `notification` | [`NotificationState`] | Single transient message |
//! | `player` | [`PlayerState`] | Current track, current list, rate |
//! | `playlistModal` | [`PlaylistModalState`] | Playlist picker coordination |

pub mod slices;
pub mod store;

pub use slices::auth::{AuthAction, AuthSlice, AuthState};
pub use slices::notification::{
    NotificationAction, NotificationKind, NotificationSlice, NotificationState,
};
pub use slices::player::{PlayerAction, PlayerSlice, PlayerState};
pub use slices::playlist_modal::{PlaylistModalAction, PlaylistModalSlice, PlaylistModalState};
pub use store::{AppStore, Selection, Slice, SliceStore};
