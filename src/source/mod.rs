//! Record sources feeding the normalizer
//!
//! A source only delivers raw records; all validation happens in the
//! normalizer. Two implementations exist: a JSON file on disk and the AEMET
//! OpenData API.

pub mod aemet;

pub use aemet::AemetClient;

use crate::error::{Result, StationError};
use crate::models::RawStationRecord;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Anything that can produce a batch of raw station records
pub trait RecordSource {
    /// Human readable origin, used in logs and errors
    fn name(&self) -> String;

    fn fetch_stations(&self) -> impl Future<Output = Result<Vec<RawStationRecord>>> + Send;
}

/// Station inventory stored as a JSON array of objects
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for JsonFileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_stations(&self) -> Result<Vec<RawStationRecord>> {
        debug!("Reading station records from {}", self.path.display());
        let contents = tokio::fs::read(&self.path).await?;
        let value: Value = serde_json::from_slice(&contents)?;
        let records = records_from_json(&self.name(), value)?;
        info!("Loaded {} raw records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

/// Split a JSON array into raw records
///
/// Elements that are not objects are skipped with a warning; only a payload
/// that is not an array is rejected.
pub fn records_from_json(source_name: &str, value: Value) -> Result<Vec<RawStationRecord>> {
    let Value::Array(items) = value else {
        return Err(StationError::invalid_payload(
            source_name,
            "expected a JSON array of station records",
        ));
    };

    let total = items.len();
    let mut records = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        match RawStationRecord::from_json(item) {
            Some(record) => records.push(record),
            None => warn!("{}: element {} is not a JSON object, skipped", source_name, index),
        }
    }

    let skipped = total - records.len();
    if skipped > 0 {
        warn!(
            "{}: skipped {} of {} elements that were not station objects",
            source_name, skipped, total
        );
    }
    Ok(records)
}
