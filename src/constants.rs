//! Application constants for the AEMET station pipeline
//!
//! Source field names, precision defaults, coordinate bounds and API
//! endpoints used throughout the crate.

// =============================================================================
// Source Field Names
// =============================================================================

/// Field names as delivered by the AEMET station inventory, with the English
/// aliases produced when a normalized dataset is turned back into raw records.
pub mod fields {
    pub const STATION_ID: &str = "indicativo";
    pub const NAME: &str = "nombre";
    pub const PROVINCE: &str = "provincia";
    pub const ALTITUDE: &str = "altitud";
    pub const LATITUDE: &str = "latitud";
    pub const LONGITUDE: &str = "longitud";

    pub const STATION_ID_ALIAS: &str = "station_id";
    pub const NAME_ALIAS: &str = "name";
    pub const PROVINCE_ALIAS: &str = "province";
    pub const ALTITUDE_ALIAS: &str = "altitude";
    pub const LATITUDE_ALIAS: &str = "latitude";
    pub const LONGITUDE_ALIAS: &str = "longitude";
}

// =============================================================================
// Precision and Bounds
// =============================================================================

/// Decimal places kept for stored latitude/longitude
pub const DEFAULT_COORDINATE_DECIMALS: u32 = 6;

/// Decimal places kept for stored altitude (whole meters)
pub const DEFAULT_ALTITUDE_DECIMALS: u32 = 0;

/// Decimal places used when presenting coordinates
pub const DEFAULT_DISPLAY_COORDINATE_DECIMALS: u32 = 4;

/// Decimal places used when presenting altitude
pub const DEFAULT_DISPLAY_ALTITUDE_DECIMALS: u32 = 0;

/// Upper limit for any configured precision
pub const MAX_DECIMALS: u32 = 12;

/// Sexagesimal component limits for the DDMMSS encoding
pub mod dms {
    pub const MAX_DEGREES: u32 = 90;
    pub const MINUTES_PER_DEGREE: u32 = 60;
    pub const SECONDS_PER_MINUTE: u32 = 60;
    pub const SECONDS_PER_DEGREE: f64 = 3600.0;
}

pub const MAX_LATITUDE: f64 = 90.0;
pub const MAX_LONGITUDE: f64 = 180.0;

// =============================================================================
// AEMET OpenData API
// =============================================================================

pub const DEFAULT_API_BASE_URL: &str = "https://opendata.aemet.es/opendata/api";

/// Inventory of every climatological station
pub const STATION_INVENTORY_ENDPOINT: &str =
    "/valores/climatologicos/inventarioestaciones/todasestaciones/";

/// Latest conventional observations for one station (`{id}` is substituted, percent-encoded)
pub const STATION_OBSERVATION_ENDPOINT: &str = "/observacion/convencional/datos/estacion/{id}";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Environment variables consulted while loading configuration
pub mod env {
    pub const API_KEY: &str = "AEMET_API_KEY";
    pub const BASE_URL: &str = "AEMET_BASE_URL";
}

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "aemet-stations";
pub const CONFIG_FILE_NAME: &str = "config.json";
