//! Field extraction utilities for raw station records
//!
//! Helpers that pull one typed value out of a [`RawStationRecord`] and report
//! the matching [`DropReason`] when it cannot be used.

use super::schema::RequiredField;
use super::stats::DropReason;
use crate::coordinate::{Axis, CoordinateToken, parse_coordinate};
use crate::models::RawStationRecord;
use serde_json::Value;
use tracing::debug;

/// Round to a fixed number of decimal places
pub fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Non-null value for a required field
fn present_value<'a>(record: &'a RawStationRecord, field: RequiredField) -> Option<&'a Value> {
    field.lookup(record).filter(|value| !value.is_null())
}

/// Decode a coordinate field and check it against the axis range
pub fn coordinate(
    record: &RawStationRecord,
    field: RequiredField,
    axis: Axis,
) -> Result<f64, DropReason> {
    let value = present_value(record, field).ok_or(DropReason::MissingField)?;

    let token = CoordinateToken::from_json(value).ok_or_else(|| {
        debug!("{} value {} is neither a number nor a string", field, value);
        DropReason::InvalidFormat
    })?;

    let decimal = parse_coordinate(token).map_err(|failure| {
        debug!("{} rejected: {}", field, failure);
        DropReason::from(&failure)
    })?;

    if !axis.contains(decimal) {
        debug!("{} value {} outside {} bounds", field, decimal, axis);
        return Err(DropReason::CoordinateOutOfBounds);
    }

    Ok(decimal)
}

/// Coerce a JSON number or numeric string to a finite `f64`
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Altitude in meters
pub fn altitude(record: &RawStationRecord) -> Result<f64, DropReason> {
    present_value(record, RequiredField::Altitude)
        .and_then(coerce_number)
        .ok_or(DropReason::InvalidAltitude)
}

/// Trimmed text for name/province
pub fn text(record: &RawStationRecord, field: RequiredField) -> Result<String, DropReason> {
    let raw = present_value(record, field)
        .and_then(Value::as_str)
        .ok_or(DropReason::MissingField)?;

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DropReason::EmptyText);
    }
    Ok(trimmed.to_string())
}

/// Station identifier; numeric identifiers are rendered without decimals
pub fn station_id(record: &RawStationRecord) -> Result<String, DropReason> {
    let value = present_value(record, RequiredField::StationId).ok_or(DropReason::MissingField)?;

    let id = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => integer.to_string(),
            None => number.to_string(),
        },
        _ => return Err(DropReason::MissingField),
    };

    if id.is_empty() {
        return Err(DropReason::MissingField);
    }
    Ok(id)
}
