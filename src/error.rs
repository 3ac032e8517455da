//! Error handling for station data operations.
//!
//! Row-level problems never surface here: they are recovered inside the
//! normalizer and reported through its summary. These errors cover the I/O
//! boundaries around the core (record sources, configuration, export).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AEMET API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("AEMET response for {endpoint} did not include a data URL")]
    MissingDataUrl { endpoint: String },

    #[error("Unexpected payload from {source_name}: {reason}")]
    InvalidPayload { source_name: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Export to {path} failed: {reason}")]
    Export { path: PathBuf, reason: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl StationError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an interruption error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// Create an invalid payload error
    pub fn invalid_payload(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StationError>;
