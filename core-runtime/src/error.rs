//! Errors raised while assembling a [`CoreConfig`](crate::config::CoreConfig)
//! or installing logging.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid settings, or a subscriber that could not be installed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was not provided.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
