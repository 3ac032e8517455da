//! Dashboard metrics over a station dataset or any selection of it.

use crate::models::{StationDataset, StationRecord};
use serde::Serialize;
use std::collections::HashSet;

/// Headline figures for a set of stations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMetrics {
    pub total_stations: usize,
    /// Distinct provinces, compared exactly after trimming
    pub total_provinces: usize,
    /// Mean altitude in meters; `None` when there is nothing to average
    pub average_altitude: Option<f64>,
}

impl StationMetrics {
    /// Average altitude for display, e.g. `667m` or `n/a`
    pub fn format_average_altitude(&self) -> String {
        match self.average_altitude {
            Some(altitude) => format!("{:.0}m", altitude),
            None => "n/a".to_string(),
        }
    }
}

/// Metrics over a whole dataset
pub fn summarize(dataset: &StationDataset) -> StationMetrics {
    summarize_records(dataset)
}

/// Metrics over any selection of records, e.g. a province filter
pub fn summarize_records<'a, I>(records: I) -> StationMetrics
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut total_stations = 0;
    let mut provinces = HashSet::new();
    let mut altitude_sum = 0.0;
    let mut altitude_count = 0usize;

    for record in records {
        total_stations += 1;
        provinces.insert(record.province.trim());
        if record.altitude.is_finite() {
            altitude_sum += record.altitude;
            altitude_count += 1;
        }
    }

    let average_altitude = if altitude_count == 0 {
        None
    } else {
        Some(altitude_sum / altitude_count as f64)
    };

    StationMetrics {
        total_stations,
        total_provinces: provinces.len(),
        average_altitude,
    }
}
