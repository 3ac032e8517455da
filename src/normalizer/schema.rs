//! Required fields and batch-level schema validation
//!
//! A field counts as present in a batch when at least one record carries it
//! under its source name or its English alias. Rows that individually lack a
//! field present elsewhere are dropped later; a field absent from the whole
//! batch rejects the batch.

use crate::constants::fields;
use crate::models::RawStationRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Fields every station record must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    StationId,
    Name,
    Province,
    Altitude,
    Latitude,
    Longitude,
}

impl RequiredField {
    pub const ALL: [RequiredField; 6] = [
        RequiredField::StationId,
        RequiredField::Name,
        RequiredField::Province,
        RequiredField::Altitude,
        RequiredField::Latitude,
        RequiredField::Longitude,
    ];

    /// Name used by the AEMET inventory
    pub fn source_key(&self) -> &'static str {
        match self {
            RequiredField::StationId => fields::STATION_ID,
            RequiredField::Name => fields::NAME,
            RequiredField::Province => fields::PROVINCE,
            RequiredField::Altitude => fields::ALTITUDE,
            RequiredField::Latitude => fields::LATITUDE,
            RequiredField::Longitude => fields::LONGITUDE,
        }
    }

    /// Accepted English alias
    pub fn alias(&self) -> &'static str {
        match self {
            RequiredField::StationId => fields::STATION_ID_ALIAS,
            RequiredField::Name => fields::NAME_ALIAS,
            RequiredField::Province => fields::PROVINCE_ALIAS,
            RequiredField::Altitude => fields::ALTITUDE_ALIAS,
            RequiredField::Latitude => fields::LATITUDE_ALIAS,
            RequiredField::Longitude => fields::LONGITUDE_ALIAS,
        }
    }

    /// Value for this field, preferring the source name over the alias
    pub fn lookup<'a>(&self, record: &'a RawStationRecord) -> Option<&'a Value> {
        record
            .get(self.source_key())
            .or_else(|| record.get(self.alias()))
    }

    /// Whether the record carries the key at all (null values included)
    pub fn is_present_in(&self, record: &RawStationRecord) -> bool {
        record.contains_key(self.source_key()) || record.contains_key(self.alias())
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_key())
    }
}

/// Batch rejected because required fields are absent from every record
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("batch is missing required fields [{}] (available: [{}])", join(.missing), .available.join(", "))]
pub struct SchemaError {
    pub missing: Vec<RequiredField>,
    pub available: Vec<String>,
}

fn join(missing: &[RequiredField]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check that every required field appears somewhere in the batch.
///
/// An empty batch has nothing to validate and passes.
pub fn check_schema(records: &[RawStationRecord]) -> Result<(), SchemaError> {
    if records.is_empty() {
        return Ok(());
    }

    let missing: Vec<RequiredField> = RequiredField::ALL
        .into_iter()
        .filter(|field| !records.iter().any(|record| field.is_present_in(record)))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let available: BTreeSet<&str> = records.iter().flat_map(|record| record.keys()).collect();

    Err(SchemaError {
        missing,
        available: available.into_iter().map(str::to_string).collect(),
    })
}
