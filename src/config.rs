//! Configuration management and validation.
//!
//! Provides configuration structures for the AEMET API client, the
//! normalizer's precision rules and export settings, loaded in layers:
//! defaults, then a JSON config file, then environment variables. CLI
//! overrides are applied on top by the command layer.

use crate::constants::{
    self, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_ALTITUDE_DECIMALS, DEFAULT_API_BASE_URL,
    DEFAULT_COORDINATE_DECIMALS, DEFAULT_DISPLAY_ALTITUDE_DECIMALS,
    DEFAULT_DISPLAY_COORDINATE_DECIMALS, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_DECIMALS,
};
use crate::error::{Result, StationError};
use clap::ValueEnum;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub normalizer: NormalizerConfig,
    pub export: ExportConfig,
}

/// AEMET OpenData client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the OpenData API
    pub base_url: String,

    /// API key issued by AEMET; required only for network fetches
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound on simultaneous observation requests
    pub max_concurrent_requests: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Precision rules applied while normalizing and presenting stations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Decimals kept for stored latitude/longitude
    pub coordinate_decimals: u32,

    /// Decimals kept for stored altitude
    pub altitude_decimals: u32,

    /// Decimals shown for latitude/longitude
    pub display_coordinate_decimals: u32,

    /// Decimals shown for altitude
    pub display_altitude_decimals: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            coordinate_decimals: DEFAULT_COORDINATE_DECIMALS,
            altitude_decimals: DEFAULT_ALTITUDE_DECIMALS,
            display_coordinate_decimals: DEFAULT_DISPLAY_COORDINATE_DECIMALS,
            display_altitude_decimals: DEFAULT_DISPLAY_ALTITUDE_DECIMALS,
        }
    }
}

impl NormalizerConfig {
    pub fn with_coordinate_decimals(mut self, decimals: u32) -> Self {
        self.coordinate_decimals = decimals;
        self
    }

    pub fn with_altitude_decimals(mut self, decimals: u32) -> Self {
        self.altitude_decimals = decimals;
        self
    }

    pub fn with_display_coordinate_decimals(mut self, decimals: u32) -> Self {
        self.display_coordinate_decimals = decimals;
        self
    }

    pub fn with_display_altitude_decimals(mut self, decimals: u32) -> Self {
        self.display_altitude_decimals = decimals;
        self
    }

    /// Reject precisions that `f64` cannot represent meaningfully
    pub fn validate(&self) -> Result<()> {
        let settings = [
            ("coordinate_decimals", self.coordinate_decimals),
            ("altitude_decimals", self.altitude_decimals),
            ("display_coordinate_decimals", self.display_coordinate_decimals),
            ("display_altitude_decimals", self.display_altitude_decimals),
        ];
        for (name, value) in settings {
            if value > MAX_DECIMALS {
                return Err(StationError::configuration(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_DECIMALS, value
                )));
            }
        }
        Ok(())
    }
}

/// Output file format for exported station tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Parquet,
}

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub compression: CompressionAlgorithm,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            compression: CompressionAlgorithm::Snappy,
        }
    }
}

impl Config {
    /// Default config file location (`<config_dir>/aemet-stations/config.json`)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            StationError::configuration("Could not determine user config directory")
        })?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read a JSON config file; missing sections fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StationError::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            StationError::configuration(format!(
                "Invalid config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Load defaults, then the config file (if any), then the environment
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        debug!("Layered configuration: {:?}", config);
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(constants::env::API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup(constants::env::BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
    }

    /// Final validation of the merged configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(StationError::configuration("API base URL must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(StationError::configuration(
                "Request timeout must be at least one second",
            ));
        }
        if self.api.max_concurrent_requests == 0 {
            return Err(StationError::configuration(
                "max_concurrent_requests must be at least 1",
            ));
        }
        self.normalizer.validate()
    }

    /// API key, or a configuration error explaining where to set it
    pub fn require_api_key(&self) -> Result<&str> {
        self.api.api_key.as_deref().ok_or_else(|| {
            StationError::configuration(format!(
                "No AEMET API key configured; set {} or api.api_key in the config file",
                constants::env::API_KEY
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.normalizer.coordinate_decimals, 6);
        assert_eq!(config.normalizer.altitude_decimals, 0);
        assert_eq!(config.normalizer.display_coordinate_decimals, 4);
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.api.api_key.is_none());
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api": {"timeout_secs": 30}, "export": {"format": "parquet"}}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.export.format, ExportFormat::Parquet);
        assert_eq!(config.export.compression, CompressionAlgorithm::Snappy);
        assert_eq!(config.normalizer, NormalizerConfig::default());
    }

    #[test]
    fn test_invalid_config_file_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(StationError::Configuration { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AEMET_API_KEY", " secret-key "),
            ("AEMET_BASE_URL", "http://localhost:8080/api"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.api_key.as_deref(), Some("secret-key"));
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert_eq!(config.require_api_key().unwrap(), "secret-key");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|_| Some("   ".to_string()));
        assert!(config.api.api_key.is_none());
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.max_concurrent_requests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.normalizer = NormalizerConfig::default().with_coordinate_decimals(20);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_mapping() {
        assert!(matches!(
            CompressionAlgorithm::Snappy.to_polars_compression(),
            ParquetCompression::Snappy
        ));
        assert!(matches!(
            CompressionAlgorithm::Uncompressed.to_polars_compression(),
            ParquetCompression::Uncompressed
        ));
    }
}
