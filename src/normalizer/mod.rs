//! Dataset normalization for AEMET station inventories
//!
//! This module turns a raw batch of station records into a validated
//! [`StationDataset`] following a best-effort policy: bad rows are dropped and
//! counted, never propagated, and only a batch-wide schema failure rejects
//! the whole input.
//!
//! # Architecture
//!
//! - [`schema`] - Required fields and batch-level schema validation
//! - [`fields`] - Per-field extraction, coercion and rounding
//! - [`stats`] - Drop reasons, summary counts and the normalization result
//!
//! # Processing Pipeline
//!
//! For every record, in order:
//!
//! 1. **Coordinates**: parse latitude and longitude, check axis bounds
//! 2. **Altitude**: coerce to a finite number
//! 3. **Rounding**: stored precision from [`NormalizerConfig`]
//! 4. **Text**: trim name and province, require them non-empty
//! 5. **Identity**: keep input order, flag and drop repeated station ids
//!
//! # Example Usage
//!
//! ```rust
//! use aemet_stations::models::RawStationRecord;
//! use aemet_stations::normalizer::Normalizer;
//!
//! let records = vec![RawStationRecord::new()
//!     .with("indicativo", "3195")
//!     .with("nombre", " MADRID, RETIRO ")
//!     .with("provincia", "MADRID")
//!     .with("altitud", "667")
//!     .with("latitud", "402443N")
//!     .with("longitud", "034041W")];
//!
//! let result = Normalizer::default().normalize(&records);
//! assert_eq!(result.summary.accepted, 1);
//! assert_eq!(result.dataset.records()[0].name, "MADRID, RETIRO");
//! ```

pub mod fields;
pub mod schema;
pub mod stats;

#[cfg(test)]
pub mod tests;

pub use schema::{RequiredField, SchemaError, check_schema};
pub use stats::{DropReason, DuplicateIdWarning, NormalizationSummary, Normalized};

use crate::config::NormalizerConfig;
use crate::coordinate::Axis;
use crate::models::{RawStationRecord, StationDataset, StationRecord};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use self::fields::round_to_decimals;

/// Stateless normalizer; one instance can serve any number of batches
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one batch of raw records
    pub fn normalize(&self, records: &[RawStationRecord]) -> Normalized {
        let mut summary = NormalizationSummary::new(records.len());

        if let Err(schema_error) = check_schema(records) {
            warn!("Rejecting batch of {} records: {}", records.len(), schema_error);
            for _ in records {
                summary.record_dropped(DropReason::SchemaError);
            }
            return Normalized {
                dataset: StationDataset::empty(),
                summary,
                warnings: Vec::new(),
                schema_error: Some(schema_error),
            };
        }

        let mut accepted: Vec<StationRecord> = Vec::with_capacity(records.len());
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut warnings = Vec::new();

        for (row, record) in records.iter().enumerate() {
            let station = match self.normalize_row(record) {
                Ok(station) => station,
                Err(reason) => {
                    debug!("Dropping row {}: {}", row, reason);
                    summary.record_dropped(reason);
                    continue;
                }
            };

            if let Some(&first_row) = first_seen.get(&station.station_id) {
                let warning = DuplicateIdWarning {
                    station_id: station.station_id.clone(),
                    first_row,
                    duplicate_row: row,
                };
                warn!("{}", warning);
                warnings.push(warning);
                summary.record_dropped(DropReason::DuplicateId);
                continue;
            }

            first_seen.insert(station.station_id.clone(), row);
            summary.record_accepted();
            accepted.push(station);
        }

        info!("{}", summary.summary());

        Normalized {
            dataset: StationDataset::from_records(accepted),
            summary,
            warnings,
            schema_error: None,
        }
    }

    /// Validate and convert a single record
    pub fn normalize_row(&self, record: &RawStationRecord) -> Result<StationRecord, DropReason> {
        let latitude = fields::coordinate(record, RequiredField::Latitude, Axis::Latitude)?;
        let longitude = fields::coordinate(record, RequiredField::Longitude, Axis::Longitude)?;
        let altitude = fields::altitude(record)?;
        let name = fields::text(record, RequiredField::Name)?;
        let province = fields::text(record, RequiredField::Province)?;
        let station_id = fields::station_id(record)?;

        Ok(StationRecord {
            station_id,
            name,
            province,
            altitude: round_to_decimals(altitude, self.config.altitude_decimals),
            latitude: round_to_decimals(latitude, self.config.coordinate_decimals),
            longitude: round_to_decimals(longitude, self.config.coordinate_decimals),
        })
    }
}

/// Normalize with the default precision rules
pub fn normalize(records: &[RawStationRecord]) -> Normalized {
    Normalizer::default().normalize(records)
}
