//! # Server Cache
//!
//! Keyed cache for server reads with fetch-on-subscribe, prefix
//! invalidation and optimistic overrides.
//!
//! ## Entry lifecycle
//!
//! ```text
//! Idle ──subscribe──▶ Fetching ──ok──▶ Fresh ──invalidate──▶ Stale ──▶ Fetching ...
//!                         └────err──▶ Failed ──subscribe/invalidate──▶ Fetching ...
//! ```
//!
//! A value written with [`ServerCache::set_data`] sits in an overlay on top
//! of the slot and is what readers see until the next successful fetch
//! replaces it. The cache never rolls an overlay back by itself.
//!
//! Fetches run on the ambient tokio runtime; subscribing outside one panics
//! in `tokio::spawn`.

pub mod cache;
pub mod key;

pub use cache::{FetchError, QueryHandle, QueryOptions, QueryState, ServerCache};
pub use key::QueryKey;
