//! # Catalogue Model Module
//!
//! Typed mirrors of the API's tracks, playlists, history and profiles,
//! plus the list semantics the playback controller relies on.
//!
//! ## Overview
//!
//! - [`Track`](models::Track) and [`TrackList`](models::TrackList) with
//!   ordered-id list identity
//! - [`PlaybackRate`](models::PlaybackRate), the closed set of speeds
//! - History grouping and the optimistic removal helper
//! - Signed-in and public profiles

pub mod error;
pub mod models;

pub use error::{LibraryError, Result};
pub use models::{
    without_history_entries, HistoryAudio, HistoryDay, HistoryRecord, ListProvenance, Owner,
    Playlist, PlaylistAudios, PlaybackRate, Profile, PublicProfile, Track, TrackList, Visibility,
};
