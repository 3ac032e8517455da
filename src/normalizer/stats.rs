//! Normalization statistics and result structures
//!
//! This module provides the drop-reason taxonomy, the per-batch summary, the
//! non-fatal duplicate identifier warning, and the overall result returned by
//! the normalizer.

use super::schema::SchemaError;
use crate::coordinate::ParseFailure;
use crate::models::StationDataset;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Why a raw record was left out of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Coordinate token blank after trimming
    EmptyInput,
    /// Coordinate token not `DDMMSS` + hemisphere letter
    InvalidFormat,
    /// Degrees, minutes or seconds outside sexagesimal bounds
    OutOfRange,
    /// Decimal coordinate not finite or outside the axis range
    CoordinateOutOfBounds,
    /// Altitude absent or not numeric
    InvalidAltitude,
    /// Required field absent, null, or of the wrong type
    MissingField,
    /// Name or province blank after trimming
    EmptyText,
    /// Station id already used by an earlier accepted row
    DuplicateId,
    /// Whole batch rejected by the schema check
    SchemaError,
}

impl From<&ParseFailure> for DropReason {
    fn from(failure: &ParseFailure) -> Self {
        match failure {
            ParseFailure::EmptyInput => DropReason::EmptyInput,
            ParseFailure::InvalidFormat { .. } => DropReason::InvalidFormat,
            ParseFailure::OutOfRange { .. } => DropReason::OutOfRange,
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DropReason::EmptyInput => "empty coordinate",
            DropReason::InvalidFormat => "invalid coordinate format",
            DropReason::OutOfRange => "coordinate component out of range",
            DropReason::CoordinateOutOfBounds => "coordinate outside axis bounds",
            DropReason::InvalidAltitude => "invalid altitude",
            DropReason::MissingField => "missing field",
            DropReason::EmptyText => "empty name or province",
            DropReason::DuplicateId => "duplicate station id",
            DropReason::SchemaError => "schema error",
        };
        write!(f, "{}", label)
    }
}

/// Non-fatal warning: two rows share a station identifier
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "duplicate station id '{station_id}' at row {duplicate_row} (first accepted at row {first_row})"
)]
pub struct DuplicateIdWarning {
    pub station_id: String,
    /// Input index of the accepted row
    pub first_row: usize,
    /// Input index of the row that was dropped
    pub duplicate_row: usize,
}

/// Counts for one normalization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationSummary {
    pub total_input: usize,
    pub accepted: usize,
    pub dropped_rows: usize,
    pub drop_reasons: BTreeMap<DropReason, usize>,
}

impl NormalizationSummary {
    pub fn new(total_input: usize) -> Self {
        Self {
            total_input,
            ..Default::default()
        }
    }

    pub fn record_accepted(&mut self) {
        self.accepted += 1;
    }

    pub fn record_dropped(&mut self, reason: DropReason) {
        self.dropped_rows += 1;
        *self.drop_reasons.entry(reason).or_insert(0) += 1;
    }

    /// Rows dropped for one reason
    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.drop_reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Every input row is either accepted or dropped for exactly one reason
    pub fn is_consistent(&self) -> bool {
        self.accepted + self.dropped_rows == self.total_input
            && self.drop_reasons.values().sum::<usize>() == self.dropped_rows
    }

    /// Accepted rows as a percentage of input
    pub fn acceptance_rate(&self) -> f64 {
        if self.total_input == 0 {
            100.0
        } else {
            (self.accepted as f64 / self.total_input as f64) * 100.0
        }
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        let reasons = if self.drop_reasons.is_empty() {
            "none".to_string()
        } else {
            self.drop_reasons
                .iter()
                .map(|(reason, count)| format!("{}: {}", reason, count))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Normalization Summary: {} -> {} stations ({:.1}% accepted) | Dropped: {} ({})",
            self.total_input,
            self.accepted,
            self.acceptance_rate(),
            self.dropped_rows,
            reasons
        )
    }
}

/// Result of normalizing one batch.
///
/// A schema failure is reported here rather than returned as an error, so
/// callers can always render an (empty) dataset.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub dataset: StationDataset,
    pub summary: NormalizationSummary,
    pub warnings: Vec<DuplicateIdWarning>,
    pub schema_error: Option<SchemaError>,
}

impl Normalized {
    /// False when the batch was rejected as a whole
    pub fn is_ok(&self) -> bool {
        self.schema_error.is_none()
    }
}
