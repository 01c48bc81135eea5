//! # Session Module
//!
//! Persists the bearer token that authenticates API calls.
//!
//! Sign-in, sign-up and password flows happen in host screens; by the time
//! the core sees a session it is already a token. This crate only stores,
//! reads and clears it through the host's [`SecureStore`](bridge_traits::SecureStore).

pub mod error;
pub mod token_store;

pub use error::{AuthError, Result};
pub use token_store::{SessionToken, TokenStore, AUTH_TOKEN_KEY};
