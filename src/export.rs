//! Station table export
//!
//! Converts a station selection into a polars [`DataFrame`] with stable column
//! names and writes it as CSV or Parquet. An empty selection still produces a
//! file carrying the header (CSV) or the schema (Parquet).

use crate::config::{CompressionAlgorithm, ExportConfig, ExportFormat};
use crate::constants::fields;
use crate::error::{Result, StationError};
use crate::models::StationRecord;
use polars::prelude::{
    Column, CsvWriter, DataFrame, ParquetWriter as PolarsParquetWriter, SerWriter,
};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Column order of every exported table
pub const EXPORT_COLUMNS: [&str; 6] = [
    fields::STATION_ID_ALIAS,
    fields::NAME_ALIAS,
    fields::PROVINCE_ALIAS,
    fields::ALTITUDE_ALIAS,
    fields::LATITUDE_ALIAS,
    fields::LONGITUDE_ALIAS,
];

/// Build a DataFrame from any selection of stations
pub fn to_dataframe<'a, I>(records: I) -> Result<DataFrame>
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let records: Vec<&StationRecord> = records.into_iter().collect();

    let station_ids: Vec<&str> = records.iter().map(|r| r.station_id.as_str()).collect();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let provinces: Vec<&str> = records.iter().map(|r| r.province.as_str()).collect();
    let altitudes: Vec<f64> = records.iter().map(|r| r.altitude).collect();
    let latitudes: Vec<f64> = records.iter().map(|r| r.latitude).collect();
    let longitudes: Vec<f64> = records.iter().map(|r| r.longitude).collect();

    let df = DataFrame::new(vec![
        Column::new(fields::STATION_ID_ALIAS.into(), station_ids),
        Column::new(fields::NAME_ALIAS.into(), names),
        Column::new(fields::PROVINCE_ALIAS.into(), provinces),
        Column::new(fields::ALTITUDE_ALIAS.into(), altitudes),
        Column::new(fields::LATITUDE_ALIAS.into(), latitudes),
        Column::new(fields::LONGITUDE_ALIAS.into(), longitudes),
    ])?;

    Ok(df)
}

/// Write a DataFrame as CSV with a header row
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| StationError::Export {
            path: path.to_path_buf(),
            reason: format!("Failed to write CSV: {}", e),
        })?;

    debug!("Wrote {} rows of CSV to {}", df.height(), path.display());
    Ok(())
}

/// Write a DataFrame as Parquet
pub fn write_parquet(
    df: &mut DataFrame,
    path: &Path,
    compression: CompressionAlgorithm,
) -> Result<u64> {
    let file = File::create(path)?;
    let bytes = PolarsParquetWriter::new(file)
        .with_compression(compression.to_polars_compression())
        .finish(df)
        .map_err(|e| StationError::Export {
            path: path.to_path_buf(),
            reason: format!("Failed to write parquet: {}", e),
        })?;

    debug!(
        "Wrote {} rows ({} bytes) of parquet to {}",
        df.height(),
        bytes,
        path.display()
    );
    Ok(bytes)
}

/// Export a selection in the configured format, returning the row count
pub fn export_stations<'a, I>(records: I, path: &Path, config: &ExportConfig) -> Result<usize>
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    let mut df = to_dataframe(records)?;
    match config.format {
        ExportFormat::Csv => write_csv(&mut df, path)?,
        ExportFormat::Parquet => {
            write_parquet(&mut df, path, config.compression)?;
        }
    }

    info!(
        "Exported {} stations to {} ({:?})",
        df.height(),
        path.display(),
        config.format
    );
    Ok(df.height())
}
