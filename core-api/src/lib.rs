//! # Remote API Module
//!
//! Typed access to the Podify server through the host's
//! [`HttpClient`](bridge_traits::http::HttpClient).
//!
//! Non-2xx responses become [`ApiError`]; the server's `{ "message": ... }`
//! body, when present, is kept for display via [`ApiError::user_message`].

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, Result, GENERIC_ERROR_MESSAGE};
