//! The four client slices.

pub mod auth;
pub mod notification;
pub mod player;
pub mod playlist_modal;
