//! Command-line argument definitions for the AEMET station tool
//!
//! This module defines the CLI interface using the clap derive API. Global
//! flags (verbosity, quiet mode, config file) apply to every subcommand.

use crate::config::{CompressionAlgorithm, ExportFormat};
use crate::error::{Result, StationError};
use crate::query::ProvinceFilter;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the AEMET station dataset tool
///
/// Normalizes AEMET weather-station inventories (DMS coordinates, text
/// fields, altitude) into a clean dataset, reports dashboard metrics and
/// exports the selection as CSV or Parquet.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "aemet-stations",
    version,
    about = "Normalize AEMET weather-station inventories and report station metrics",
    long_about = "Reads the AEMET OpenData station inventory (from the API or a saved JSON file), \
                  converts the DDMMSS+hemisphere coordinates to decimal degrees, drops malformed \
                  rows with a per-reason summary, and reports station counts, provinces and \
                  average altitude. The resulting selection can be exported as CSV or Parquet."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Path to configuration file
    ///
    /// JSON configuration file for API and precision settings. If not
    /// specified, looks for <config_dir>/aemet-stations/config.json
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        global = true,
        help = "Path to configuration file (JSON format)"
    )]
    pub config_file: Option<PathBuf>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Normalize a station inventory saved as a JSON file
    Normalize(NormalizeArgs),
    /// Fetch the station inventory from AEMET OpenData and normalize it
    Fetch(FetchArgs),
    /// Show the latest conventional observation for one or more stations
    Observe(ObserveArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Normalize(_) => "normalize",
            Commands::Fetch(_) => "fetch",
            Commands::Observe(_) => "observe",
        }
    }
}

/// Arguments for the normalize command (offline pipeline)
#[derive(Debug, Clone, Parser)]
pub struct NormalizeArgs {
    /// JSON file holding an array of station records
    #[arg(
        short = 'i',
        long = "input",
        value_name = "FILE",
        help = "JSON file with the raw station inventory"
    )]
    pub input: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for the fetch command
#[derive(Debug, Clone, Parser)]
pub struct FetchArgs {
    /// Save the raw inventory as received, before normalization
    #[arg(
        long = "save-raw",
        value_name = "FILE",
        help = "Also save the raw inventory as JSON"
    )]
    pub save_raw: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Options shared by every command that runs the normalization pipeline
#[derive(Debug, Clone, Parser)]
pub struct PipelineArgs {
    /// Restrict metrics and export to one province
    ///
    /// Matched exactly against the normalized (trimmed) province name.
    #[arg(
        short = 'p',
        long = "province",
        value_name = "NAME",
        help = "Only report and export stations of this province"
    )]
    pub province: Option<String>,

    /// Export the selected stations to this file
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Export the selected stations to FILE"
    )]
    pub output: Option<PathBuf>,

    /// Export format; inferred from the output extension when omitted
    #[arg(long = "format", value_enum, help = "Export format (csv or parquet)")]
    pub format: Option<ExportFormat>,

    /// Parquet compression
    #[arg(
        long = "compression",
        value_enum,
        help = "Compression for parquet exports"
    )]
    pub compression: Option<CompressionAlgorithm>,

    /// Decimal places kept for stored coordinates
    #[arg(
        long = "coordinate-decimals",
        value_name = "N",
        help = "Decimal places kept for latitude/longitude"
    )]
    pub coordinate_decimals: Option<u32>,

    /// List every selected station in the report
    #[arg(long = "list", help = "List the selected stations")]
    pub list: bool,

    /// Output format for the report
    #[arg(
        long = "report",
        value_enum,
        default_value = "human",
        help = "Output format for the report"
    )]
    pub report: ReportFormat,
}

/// Arguments for the observe command
#[derive(Debug, Clone, Parser)]
pub struct ObserveArgs {
    /// AEMET station identifiers (indicativo), e.g. 3195
    #[arg(required = true, value_name = "ID", help = "Station identifiers")]
    pub station_ids: Vec<String>,

    /// Output format for the report
    #[arg(
        long = "report",
        value_enum,
        default_value = "human",
        help = "Output format for the report"
    )]
    pub report: ReportFormat,
}

/// Report format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl Args {
    /// Get log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress spinners (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Validate the arguments for consistency
    pub fn validate(&self) -> Result<()> {
        match &self.command {
            Some(Commands::Normalize(args)) => {
                if !args.input.exists() {
                    return Err(StationError::configuration(format!(
                        "Input file does not exist: {}",
                        args.input.display()
                    )));
                }
                args.pipeline.validate()
            }
            Some(Commands::Fetch(args)) => args.pipeline.validate(),
            Some(Commands::Observe(args)) => {
                if args.station_ids.iter().any(|id| id.trim().is_empty()) {
                    return Err(StationError::configuration(
                        "Station identifiers must not be empty",
                    ));
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl PipelineArgs {
    pub fn province_filter(&self) -> ProvinceFilter {
        ProvinceFilter::from_option(self.province.as_deref())
    }

    /// Export format: explicit flag, then output extension, then the fallback
    pub fn export_format(&self, fallback: ExportFormat) -> ExportFormat {
        if let Some(format) = self.format {
            return format;
        }
        let extension = self
            .output
            .as_ref()
            .and_then(|path| path.extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("parquet") | Some("pq") => ExportFormat::Parquet,
            Some("csv") => ExportFormat::Csv,
            _ => fallback,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(output) = &self.output {
            if output.is_dir() {
                return Err(StationError::configuration(format!(
                    "Output must be a file, not a directory: {}",
                    output.display()
                )));
            }
        }
        if self.compression.is_some() && self.export_format(ExportFormat::Csv) == ExportFormat::Csv
        {
            return Err(StationError::configuration(
                "--compression only applies to parquet exports",
            ));
        }
        Ok(())
    }
}
