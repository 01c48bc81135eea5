//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `podify-workspace` and
//! enable `desktop-shims` to get the reqwest/keyring bridges wired into
//! [`core_service::CoreService`] without listing each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
