//! Error types for pagepulse-core

use thiserror::Error;

/// Main error type for the pagepulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure talking to the downstream collector
    #[error("relay error: {0}")]
    Relay(String),

    /// Collector answered with a non-2xx status
    #[error("collector returned HTTP {status}: {body}")]
    RelayStatus { status: u16, body: String },

    /// Client-side persisted state could not be written
    #[error("store error: {0}")]
    Store(String),
}

/// Result type alias for pagepulse-core
pub type Result<T> = std::result::Result<T, Error>;
