//! Core data structures for AEMET station processing.
//!
//! Defines the untyped inbound record, the normalized station record and
//! dataset, and the observation snapshot returned by the API client.

use crate::constants::fields;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One inbound station record exactly as delivered by a record source.
///
/// No invariants hold: any field may be absent, null or of an unexpected type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStationRecord {
    fields: Map<String, Value>,
}

impl RawStationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; only objects are records
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for RawStationRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<&StationRecord> for RawStationRecord {
    /// Re-express a normalized record with the source field names and
    /// numeric coordinates, so it can pass through the normalizer again.
    fn from(record: &StationRecord) -> Self {
        RawStationRecord::new()
            .with(fields::STATION_ID, record.station_id.clone())
            .with(fields::NAME, record.name.clone())
            .with(fields::PROVINCE, record.province.clone())
            .with(fields::ALTITUDE, record.altitude)
            .with(fields::LATITUDE, record.latitude)
            .with(fields::LONGITUDE, record.longitude)
    }
}

/// A validated station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Stable AEMET identifier (`indicativo`)
    pub station_id: String,
    /// Trimmed station name, original casing
    pub name: String,
    /// Trimmed province name, original casing
    pub province: String,
    /// Meters above sea level
    pub altitude: f64,
    /// Decimal degrees, negative south of the equator
    pub latitude: f64,
    /// Decimal degrees, negative west of Greenwich
    pub longitude: f64,
}

/// Ordered collection of stations, unique by station id.
///
/// Built once per fetch by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct StationDataset {
    records: Vec<StationRecord>,
    built_at: DateTime<Utc>,
}

impl StationDataset {
    pub(crate) fn from_records(records: Vec<StationRecord>) -> Self {
        Self {
            records,
            built_at: Utc::now(),
        }
    }

    /// Dataset with no stations
    pub fn empty() -> Self {
        Self::from_records(Vec::new())
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the normalizer produced this dataset
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Raw form of every record, for re-normalization or JSON export
    pub fn to_raw_records(&self) -> Vec<RawStationRecord> {
        self.records.iter().map(RawStationRecord::from).collect()
    }
}

impl<'a> IntoIterator for &'a StationDataset {
    type Item = &'a StationRecord;
    type IntoIter = std::slice::Iter<'a, StationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Latest conventional observation reported by one station
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSnapshot {
    #[serde(rename = "idema", default)]
    pub station_id: String,
    /// End of the observation interval as sent by AEMET
    #[serde(rename = "fint", default)]
    pub observed_at: Option<String>,
    /// Air temperature (°C)
    #[serde(rename = "ta", default)]
    pub temperature: Option<f64>,
    /// Relative humidity (%)
    #[serde(rename = "hr", default)]
    pub humidity: Option<f64>,
    /// Precipitation (mm)
    #[serde(rename = "prec", default)]
    pub precipitation: Option<f64>,
    /// Mean wind speed (m/s)
    #[serde(rename = "vv", default)]
    pub wind_speed: Option<f64>,
    /// Mean wind direction (degrees)
    #[serde(rename = "dv", default)]
    pub wind_direction: Option<f64>,
    /// Station-level pressure (hPa)
    #[serde(rename = "pres", default)]
    pub pressure: Option<f64>,
}

impl ObservationSnapshot {
    /// Parse the observation timestamp, with or without a UTC offset
    pub fn observed_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.observed_at.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
            Some(dt.with_timezone(&Utc))
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        } else {
            None
        }
    }
}

/// Pick the most recent observation; entries without a timestamp lose
pub fn latest_observation(observations: Vec<ObservationSnapshot>) -> Option<ObservationSnapshot> {
    observations
        .into_iter()
        .max_by_key(|observation| observation.observed_at_utc())
}
