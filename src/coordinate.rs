//! Sexagesimal coordinate parsing for AEMET station metadata.
//!
//! AEMET encodes latitude and longitude as fixed-width `DDMMSS` strings with a
//! trailing hemisphere letter, e.g. `394924N` for 39°49'24" North or
//! `034200W` for 3°42'00" West. This module turns one such token into signed
//! decimal degrees.
//!
//! The parser has no notion of which axis it is converting. Checking that a
//! decoded value fits the latitude or longitude range is left to the dataset
//! normalizer, see [`Axis`].

use crate::constants::{MAX_LATITUDE, MAX_LONGITUDE, dms};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Two digits each for degrees, minutes and seconds, then the hemisphere.
static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{2})([0-9]{2})([0-9]{2})([NSEWnsew])$").expect("DMS pattern is valid")
});

/// Reasons a coordinate token cannot be converted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("coordinate token is empty")]
    EmptyInput,

    #[error("coordinate token '{token}' is not DDMMSS followed by N, S, E or W")]
    InvalidFormat { token: String },

    #[error("coordinate components out of range: {degrees}° {minutes}' {seconds}\"")]
    OutOfRange {
        degrees: u32,
        minutes: u32,
        seconds: u32,
    },
}

/// Input to [`parse_coordinate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateToken<'a> {
    /// Already expressed in decimal degrees
    Numeric(f64),
    /// `DDMMSS` plus hemisphere letter
    Text(&'a str),
}

impl<'a> CoordinateToken<'a> {
    /// Borrow a token from a JSON value. Only numbers and strings qualify.
    pub fn from_json(value: &'a serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(number) => number.as_f64().map(Self::Numeric),
            serde_json::Value::String(text) => Some(Self::Text(text)),
            _ => None,
        }
    }
}

impl From<f64> for CoordinateToken<'_> {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

impl<'a> From<&'a str> for CoordinateToken<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for CoordinateToken<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value.as_str())
    }
}

/// Geographic axis a decoded value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Largest absolute value allowed on this axis
    pub fn max_abs(&self) -> f64 {
        match self {
            Axis::Latitude => MAX_LATITUDE,
            Axis::Longitude => MAX_LONGITUDE,
        }
    }

    /// Check that a decimal value is finite and inside the axis bounds
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value.abs() <= self.max_abs()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// Hemisphere letter of a sexagesimal token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// Parse a hemisphere letter, ignoring case
    pub fn from_char(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'N' => Some(Hemisphere::North),
            'S' => Some(Hemisphere::South),
            'E' => Some(Hemisphere::East),
            'W' => Some(Hemisphere::West),
            _ => None,
        }
    }

    /// South and West are negative
    pub fn sign(&self) -> f64 {
        match self {
            Hemisphere::North | Hemisphere::East => 1.0,
            Hemisphere::South | Hemisphere::West => -1.0,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Hemisphere::North | Hemisphere::South => Axis::Latitude,
            Hemisphere::East | Hemisphere::West => Axis::Longitude,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        }
    }
}

/// A validated sexagesimal coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmsCoordinate {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub hemisphere: Hemisphere,
}

impl DmsCoordinate {
    /// Parse a `DDMMSS` + hemisphere token
    pub fn parse(token: &str) -> Result<Self, ParseFailure> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ParseFailure::EmptyInput);
        }

        let captures = DMS_PATTERN
            .captures(trimmed)
            .ok_or_else(|| ParseFailure::InvalidFormat {
                token: trimmed.to_string(),
            })?;

        // The pattern only admits ASCII digits and a known letter, so the
        // conversions below cannot fail for a match.
        let component = |index: usize| -> Result<u32, ParseFailure> {
            captures[index]
                .parse::<u32>()
                .map_err(|_| ParseFailure::InvalidFormat {
                    token: trimmed.to_string(),
                })
        };
        let degrees = component(1)?;
        let minutes = component(2)?;
        let seconds = component(3)?;
        let hemisphere = captures[4]
            .chars()
            .next()
            .and_then(Hemisphere::from_char)
            .ok_or_else(|| ParseFailure::InvalidFormat {
                token: trimmed.to_string(),
            })?;

        if degrees > dms::MAX_DEGREES
            || minutes >= dms::MINUTES_PER_DEGREE
            || seconds >= dms::SECONDS_PER_MINUTE
        {
            return Err(ParseFailure::OutOfRange {
                degrees,
                minutes,
                seconds,
            });
        }

        Ok(Self {
            degrees,
            minutes,
            seconds,
            hemisphere,
        })
    }

    /// Signed decimal degrees
    pub fn to_decimal(&self) -> f64 {
        let magnitude = f64::from(self.degrees)
            + f64::from(self.minutes) / f64::from(dms::MINUTES_PER_DEGREE)
            + f64::from(self.seconds) / dms::SECONDS_PER_DEGREE;
        magnitude * self.hemisphere.sign()
    }
}

impl fmt::Display for DmsCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:02}{:02}{}",
            self.degrees,
            self.minutes,
            self.seconds,
            self.hemisphere.letter()
        )
    }
}

/// Convert one coordinate token to decimal degrees.
///
/// Numeric tokens are returned unchanged without any range check; callers
/// that know the axis validate the result with [`Axis::contains`].
pub fn parse_coordinate<'a>(token: impl Into<CoordinateToken<'a>>) -> Result<f64, ParseFailure> {
    match token.into() {
        CoordinateToken::Numeric(value) => Ok(value),
        CoordinateToken::Text(text) => match DmsCoordinate::parse(text) {
            Ok(coordinate) => {
                let decimal = coordinate.to_decimal();
                debug!("Converted {} to {:.6}", coordinate, decimal);
                Ok(decimal)
            }
            Err(failure) => {
                debug!("Rejected coordinate token {:?}: {}", text, failure);
                Err(failure)
            }
        },
    }
}
