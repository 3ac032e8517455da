//! AEMET Stations Library
//!
//! A Rust library for turning the AEMET OpenData weather-station inventory
//! into a clean, validated station dataset.
//!
//! This library provides tools for:
//! - Parsing `DDMMSS` + hemisphere coordinates into signed decimal degrees
//! - Normalizing raw inventory batches with per-reason drop accounting
//! - Summarizing stations into dashboard metrics
//! - Filtering by province and selecting stations by name and province
//! - Exporting station selections as CSV or Parquet
//! - Fetching the inventory and latest observations from AEMET OpenData

pub mod config;
pub mod constants;
pub mod coordinate;
pub mod error;
pub mod export;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod query;
pub mod source;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::Config;
pub use coordinate::{ParseFailure, parse_coordinate};
pub use error::{Result, StationError};
pub use metrics::{StationMetrics, summarize};
pub use models::{RawStationRecord, StationDataset, StationRecord};
pub use normalizer::{NormalizationSummary, Normalized, Normalizer, normalize};
