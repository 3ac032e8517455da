//! Station dataset queries and display formatting
//!
//! Province filtering, station selection and the on-demand display variant
//! of a station. Selection is always keyed on the name and province pair:
//! station names repeat across provinces.

use crate::config::NormalizerConfig;
use crate::models::{StationDataset, StationRecord};
use crate::normalizer::fields::round_to_decimals;
use serde::Serialize;
use std::collections::BTreeSet;

/// Province selection for the station list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProvinceFilter {
    #[default]
    All,
    Only(String),
}

impl ProvinceFilter {
    /// `None` or a blank name selects every province
    pub fn from_option(province: Option<&str>) -> Self {
        match province.map(str::trim) {
            Some(name) if !name.is_empty() => ProvinceFilter::Only(name.to_string()),
            _ => ProvinceFilter::All,
        }
    }

    pub fn matches(&self, record: &StationRecord) -> bool {
        match self {
            ProvinceFilter::All => true,
            ProvinceFilter::Only(province) => record.province == *province,
        }
    }
}

impl StationDataset {
    /// Distinct provinces in sorted order
    pub fn provinces(&self) -> Vec<&str> {
        self.iter()
            .map(|record| record.province.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Stations matching a province filter, in dataset order
    pub fn filter(&self, filter: &ProvinceFilter) -> Vec<&StationRecord> {
        self.iter().filter(|record| filter.matches(record)).collect()
    }

    pub fn find_by_id(&self, station_id: &str) -> Option<&StationRecord> {
        self.iter().find(|record| record.station_id == station_id)
    }

    /// Select a station by its name and province
    pub fn find(&self, name: &str, province: &str) -> Option<&StationRecord> {
        self.iter()
            .find(|record| record.name == name && record.province == province)
    }
}

/// Label shown in a station selector, e.g. `MADRID, RETIRO (MADRID)`
pub fn selector_label(record: &StationRecord) -> String {
    format!("{} ({})", record.name, record.province)
}

/// Capitalize the first cased letter of every word, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }

    result
}

/// Presentation form of a station; computed on demand, never stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayStation {
    pub station_id: String,
    pub name: String,
    pub province: String,
    pub altitude: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl DisplayStation {
    pub fn new(record: &StationRecord, config: &NormalizerConfig) -> Self {
        Self {
            station_id: record.station_id.clone(),
            name: title_case(&record.name),
            province: title_case(&record.province),
            altitude: round_to_decimals(record.altitude, config.display_altitude_decimals),
            latitude: round_to_decimals(record.latitude, config.display_coordinate_decimals),
            longitude: round_to_decimals(record.longitude, config.display_coordinate_decimals),
        }
    }
}

impl From<&StationRecord> for DisplayStation {
    fn from(record: &StationRecord) -> Self {
        Self::new(record, &NormalizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, name: &str, province: &str) -> StationRecord {
        StationRecord {
            station_id: id.to_string(),
            name: name.to_string(),
            province: province.to_string(),
            altitude: 667.4,
            latitude: 40.411944,
            longitude: -3.678056,
        }
    }

    fn dataset() -> StationDataset {
        StationDataset::from_records(vec![
            station("3195", "MADRID, RETIRO", "MADRID"),
            station("1001", "SAN JUAN", "ALICANTE"),
            station("2002", "SAN JUAN", "BADAJOZ"),
            station("3129", "MADRID AEROPUERTO", "MADRID"),
        ])
    }

    #[test]
    fn test_provinces_sorted_unique() {
        let dataset = dataset();
        assert_eq!(dataset.provinces(), vec!["ALICANTE", "BADAJOZ", "MADRID"]);
        assert!(StationDataset::empty().provinces().is_empty());
    }

    #[test]
    fn test_filter_by_province() {
        let dataset = dataset();
        let madrid = dataset.filter(&ProvinceFilter::Only("MADRID".to_string()));
        let ids: Vec<&str> = madrid.iter().map(|s| s.station_id.as_str()).collect();
        assert_eq!(ids, vec!["3195", "3129"]);

        assert_eq!(dataset.filter(&ProvinceFilter::All).len(), 4);
        assert!(
            dataset
                .filter(&ProvinceFilter::Only("madrid".to_string()))
                .is_empty()
        );
    }

    #[test]
    fn test_filter_from_option() {
        assert_eq!(ProvinceFilter::from_option(None), ProvinceFilter::All);
        assert_eq!(ProvinceFilter::from_option(Some("  ")), ProvinceFilter::All);
        assert_eq!(
            ProvinceFilter::from_option(Some(" MADRID ")),
            ProvinceFilter::Only("MADRID".to_string())
        );
    }

    #[test]
    fn test_find_by_name_and_province() {
        let dataset = dataset();
        let badajoz = dataset.find("SAN JUAN", "BADAJOZ").unwrap();
        assert_eq!(badajoz.station_id, "2002");
        let alicante = dataset.find("SAN JUAN", "ALICANTE").unwrap();
        assert_eq!(alicante.station_id, "1001");
        assert!(dataset.find("SAN JUAN", "MADRID").is_none());
        assert_eq!(dataset.find_by_id("3129").unwrap().name, "MADRID AEROPUERTO");
    }

    #[test]
    fn test_selector_label() {
        let record = station("2002", "SAN JUAN", "BADAJOZ");
        assert_eq!(selector_label(&record), "SAN JUAN (BADAJOZ)");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("MADRID, RETIRO"), "Madrid, Retiro");
        assert_eq!(title_case("sta. cruz de tenerife"), "Sta. Cruz De Tenerife");
        assert_eq!(title_case("A CORUÑA"), "A Coruña");
        assert_eq!(title_case("L'ESTARTIT"), "L'Estartit");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_display_station_does_not_mutate_record() {
        let record = station("3195", "MADRID, RETIRO", "MADRID");
        let display = DisplayStation::from(&record);

        assert_eq!(display.name, "Madrid, Retiro");
        assert_eq!(display.province, "Madrid");
        assert_eq!(display.altitude, 667.0);
        assert_eq!(display.latitude, 40.4119);
        assert_eq!(display.longitude, -3.6781);
        assert_eq!(record.name, "MADRID, RETIRO");
        assert_eq!(record.latitude, 40.411944);
    }
}
