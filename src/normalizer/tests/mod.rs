//! Tests for the normalizer module
//!
//! Fixtures shared by the schema, pipeline and statistics tests.

pub mod stats_tests;

use crate::models::RawStationRecord;

/// A well-formed inventory record as AEMET delivers it
pub fn create_raw_station(
    id: &str,
    name: &str,
    province: &str,
    altitude: &str,
    latitude: &str,
    longitude: &str,
) -> RawStationRecord {
    RawStationRecord::new()
        .with("indicativo", id)
        .with("nombre", name)
        .with("provincia", province)
        .with("altitud", altitude)
        .with("latitud", latitude)
        .with("longitud", longitude)
        .with("indsinop", "08222")
}

/// Small mixed batch: three good stations, one bad coordinate, one bad altitude
pub fn create_mixed_batch() -> Vec<RawStationRecord> {
    vec![
        create_raw_station("3195", " MADRID, RETIRO ", "MADRID", "667", "402443N", "034041W"),
        create_raw_station("0076", "BARCELONA AEROPUERTO", "BARCELONA", "4", "411734N", "020412E"),
        create_raw_station("C447A", "TENERIFE NORTE AEROPUERTO", "STA. CRUZ DE TENERIFE", "632", "282839N", "161947W"),
        create_raw_station("9999X", "ESTACION ROTA", "SEVILLA", "10", "3725N", "055247W"),
        create_raw_station("8888Y", "SIN ALTITUD", "SEVILLA", "n/d", "372500N", "055247W"),
    ]
}
