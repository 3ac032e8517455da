//! Command implementations for the AEMET station CLI
//!
//! This module contains the command execution logic: logging setup, layered
//! configuration, the fetch/normalize/filter/export pipeline and report
//! rendering.

use crate::cli::args::{
    Args, Commands, FetchArgs, NormalizeArgs, ObserveArgs, PipelineArgs, ReportFormat,
};
use crate::config::{Config, ExportFormat};
use crate::error::{Result, StationError};
use crate::export::export_stations;
use crate::metrics::{StationMetrics, summarize_records};
use crate::models::{ObservationSnapshot, RawStationRecord};
use crate::normalizer::{DuplicateIdWarning, NormalizationSummary, Normalizer};
use crate::query::{DisplayStation, ProvinceFilter, selector_label};
use crate::source::{AemetClient, JsonFileSource, RecordSource};
use chrono::{DateTime, Utc};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one normalization pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Where the raw records came from
    pub source: String,
    pub built_at: DateTime<Utc>,
    pub summary: NormalizationSummary,
    pub duplicate_ids: Vec<DuplicateIdWarning>,
    /// Province filter applied to metrics, listing and export
    pub province: Option<String>,
    pub metrics: StationMetrics,
    /// Selected stations, only filled when listing was requested
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stations: Vec<ListedStation>,
    pub export: Option<ExportSummary>,
}

/// One row of the station listing
#[derive(Debug, Clone, Serialize)]
pub struct ListedStation {
    pub label: String,
    #[serde(flatten)]
    pub display: DisplayStation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub rows: usize,
}

/// Latest observation lookup result for one station
#[derive(Debug, Clone, Serialize)]
pub struct ObservationReport {
    pub station_id: String,
    pub observation: Option<ObservationSnapshot>,
    pub error: Option<String>,
}

/// Main command runner
///
/// Sets up logging and configuration, then dispatches to the subcommand.
/// Long-running network steps stop early when `cancellation_token` fires.
pub async fn run(args: Args, cancellation_token: CancellationToken) -> Result<()> {
    setup_logging(&args)?;

    info!("Starting aemet-stations");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;

    let Some(command) = args.command.clone() else {
        return Ok(());
    };

    let config = load_configuration(&args, &command)?;
    debug!("Loaded configuration: {:?}", config);

    match command {
        Commands::Normalize(normalize) => {
            run_normalize(&args, &config, &normalize, &cancellation_token).await
        }
        Commands::Fetch(fetch) => run_fetch(&args, &config, &fetch, &cancellation_token).await,
        Commands::Observe(observe) => {
            run_observe(&args, &config, &observe, &cancellation_token).await
        }
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aemet_stations={}", log_level)));

    let result = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    // A subscriber may already be installed when commands run in-process
    if let Err(e) = result {
        debug!("Logging already initialized: {}", e);
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using layered approach (file -> env -> args)
fn load_configuration(args: &Args, command: &Commands) -> Result<Config> {
    let default_config_path = if args.config_file.is_none() {
        Config::default_config_path().ok()
    } else {
        None
    };

    let config_file = match &args.config_file {
        Some(path) => Some(path.as_path()),
        None => default_config_path
            .as_ref()
            .filter(|path| path.exists())
            .map(|path| path.as_path()),
    };

    if let Some(config_path) = config_file {
        info!("Using config file: {}", config_path.display());
    } else {
        info!("No config file found, using defaults and environment variables");
    }

    let mut config = Config::load_layered(config_file)?;
    apply_cli_overrides(&mut config, command);
    config.validate()?;

    Ok(config)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut Config, command: &Commands) {
    let pipeline = match command {
        Commands::Normalize(args) => &args.pipeline,
        Commands::Fetch(args) => &args.pipeline,
        Commands::Observe(_) => return,
    };

    if let Some(decimals) = pipeline.coordinate_decimals {
        config.normalizer.coordinate_decimals = decimals;
    }
    if let Some(compression) = pipeline.compression {
        config.export.compression = compression;
    }
    config.export.format = pipeline.export_format(config.export.format);
}

async fn run_normalize(
    args: &Args,
    config: &Config,
    normalize: &NormalizeArgs,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let source = JsonFileSource::new(&normalize.input);
    let records = fetch_records(&source, None, cancellation_token).await?;
    let report = process_records(&source.name(), &records, config, &normalize.pipeline)?;
    print_pipeline_report(&report, normalize.pipeline.report, args.quiet)
}

async fn run_fetch(
    args: &Args,
    config: &Config,
    fetch: &FetchArgs,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let client = aemet_client(config)?;
    let spinner = args
        .show_progress()
        .then(|| create_spinner("Fetching station inventory from AEMET OpenData..."));

    let records = fetch_records(&client, spinner, cancellation_token).await?;

    if let Some(path) = &fetch.save_raw {
        save_raw_records(&records, path).await?;
    }

    let report = process_records(&client.name(), &records, config, &fetch.pipeline)?;
    print_pipeline_report(&report, fetch.pipeline.report, args.quiet)
}

async fn run_observe(
    args: &Args,
    config: &Config,
    observe: &ObserveArgs,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let client = aemet_client(config)?;
    let spinner = args.show_progress().then(|| {
        create_spinner(&format!(
            "Requesting observations for {} stations...",
            observe.station_ids.len()
        ))
    });

    let results = tokio::select! {
        results = client.observations_for(&observe.station_ids) => results,
        _ = cancellation_token.cancelled() => {
            return Err(StationError::interrupted("Observation lookup cancelled"));
        }
    };

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let mut reports = Vec::with_capacity(results.len());
    let mut first_error = None;
    let mut failures = 0;
    for (station_id, result) in results {
        match result {
            Ok(observation) => reports.push(ObservationReport {
                station_id,
                observation,
                error: None,
            }),
            Err(e) => {
                failures += 1;
                reports.push(ObservationReport {
                    station_id,
                    observation: None,
                    error: Some(e.to_string()),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    print_observation_report(&reports, observe.report)?;

    // Partial failures are reported inline; only a total failure is an error
    match first_error {
        Some(e) if failures == reports.len() => Err(e),
        _ => Ok(()),
    }
}

fn aemet_client(config: &Config) -> Result<AemetClient> {
    let api_key = config.require_api_key()?;
    AemetClient::new(&config.api, api_key)
}

/// Fetch raw records from a source, honouring cancellation
pub async fn fetch_records<S: RecordSource>(
    source: &S,
    spinner: Option<ProgressBar>,
    cancellation_token: &CancellationToken,
) -> Result<Vec<RawStationRecord>> {
    let result = tokio::select! {
        result = source.fetch_stations() => result,
        _ = cancellation_token.cancelled() => {
            Err(StationError::interrupted("Station fetch cancelled"))
        }
    };

    if let Some(spinner) = spinner {
        match &result {
            Ok(records) => spinner.finish_with_message(format!("Fetched {} records", records.len())),
            Err(_) => spinner.abandon_with_message("Fetch failed"),
        }
    }

    result
}

/// Normalize, filter, summarize and optionally export a batch of records
pub fn process_records(
    source_name: &str,
    records: &[RawStationRecord],
    config: &Config,
    pipeline: &PipelineArgs,
) -> Result<PipelineReport> {
    let normalizer = Normalizer::new(config.normalizer.clone());
    let normalized = normalizer.normalize(records);

    if let Some(schema_error) = normalized.schema_error {
        return Err(StationError::invalid_payload(
            source_name,
            schema_error.to_string(),
        ));
    }

    let dataset = normalized.dataset;
    let filter = pipeline.province_filter();
    if let ProvinceFilter::Only(province) = &filter {
        if !dataset.provinces().contains(&province.as_str()) {
            warn!("Province '{}' does not appear in the dataset", province);
        }
    }

    let selection = dataset.filter(&filter);
    let metrics = summarize_records(selection.iter().copied());
    info!(
        "Selected {} of {} stations",
        selection.len(),
        dataset.len()
    );

    let stations = if pipeline.list {
        selection
            .iter()
            .map(|record| ListedStation {
                label: selector_label(record),
                display: DisplayStation::new(record, &config.normalizer),
            })
            .collect()
    } else {
        Vec::new()
    };

    let export = match &pipeline.output {
        Some(path) => {
            let rows = export_stations(selection.iter().copied(), path, &config.export)?;
            Some(ExportSummary {
                path: path.clone(),
                format: config.export.format,
                rows,
            })
        }
        None => None,
    };

    Ok(PipelineReport {
        source: source_name.to_string(),
        built_at: dataset.built_at(),
        summary: normalized.summary,
        duplicate_ids: normalized.warnings,
        province: match filter {
            ProvinceFilter::All => None,
            ProvinceFilter::Only(province) => Some(province),
        },
        metrics,
        stations,
        export,
    })
}

async fn save_raw_records(records: &[RawStationRecord], path: &Path) -> Result<()> {
    let contents = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(path, contents).await?;
    info!("Saved {} raw records to {}", records.len(), path.display());
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_pipeline_report(report: &PipelineReport, format: ReportFormat, quiet: bool) -> Result<()> {
    match format {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        ReportFormat::Human if quiet => {}
        ReportFormat::Human => print_human_pipeline_report(report),
    }
    Ok(())
}

fn print_human_pipeline_report(report: &PipelineReport) {
    let summary = &report.summary;

    println!("\n{}", "Normalization Summary".bright_green().bold());
    println!("  Source:           {}", report.source);
    println!(
        "  Input records:    {}",
        summary.total_input.to_string().bright_white().bold()
    );
    println!(
        "  Accepted:         {} ({:.1}%)",
        summary.accepted.to_string().bright_white().bold(),
        summary.acceptance_rate()
    );
    if summary.dropped_rows > 0 {
        println!(
            "  Dropped:          {}",
            summary.dropped_rows.to_string().bright_red().bold()
        );
        for (reason, count) in &summary.drop_reasons {
            println!("    {:<36} {}", reason.to_string(), count);
        }
    } else {
        println!("  Dropped:          0");
    }
    for warning in &report.duplicate_ids {
        println!("  {} {}", "warning:".yellow().bold(), warning);
    }

    println!("\n{}", "Stations".bright_green().bold());
    println!(
        "  Province:         {}",
        report.province.as_deref().unwrap_or("All")
    );
    println!(
        "  Total stations:   {}",
        report.metrics.total_stations.to_string().bright_white().bold()
    );
    println!(
        "  Provinces:        {}",
        report.metrics.total_provinces.to_string().bright_white().bold()
    );
    println!(
        "  Average altitude: {}",
        report.metrics.format_average_altitude().bright_white().bold()
    );

    if !report.stations.is_empty() {
        println!();
        for station in &report.stations {
            println!(
                "  {:<8} {:<48} {:>9.4} {:>9.4} {:>6.0}m",
                station.display.station_id,
                station.label,
                station.display.latitude,
                station.display.longitude,
                station.display.altitude
            );
        }
    }

    if let Some(export) = &report.export {
        println!(
            "\n{} {} stations to {}",
            "Exported".bright_green().bold(),
            export.rows,
            export.path.display()
        );
    }
}

fn print_observation_report(reports: &[ObservationReport], format: ReportFormat) -> Result<()> {
    if format == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }

    println!("\n{}", "Latest Observations".bright_green().bold());
    for report in reports {
        match (&report.observation, &report.error) {
            (Some(observation), _) => println!(
                "  {:<8} {}  temp {}  humidity {}  precip {}  wind {} @ {}  pressure {}",
                report.station_id.bright_white().bold(),
                observation.observed_at.as_deref().unwrap_or("unknown time"),
                format_value(observation.temperature, "°C"),
                format_value(observation.humidity, "%"),
                format_value(observation.precipitation, "mm"),
                format_value(observation.wind_speed, "m/s"),
                format_value(observation.wind_direction, "°"),
                format_value(observation.pressure, "hPa"),
            ),
            (None, Some(error)) => println!(
                "  {:<8} {}",
                report.station_id.bright_white().bold(),
                error.bright_red()
            ),
            (None, None) => println!(
                "  {:<8} no recent observations",
                report.station_id.bright_white().bold()
            ),
        }
    }
    Ok(())
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(value) => format!("{:.1}{}", value, unit),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use tempfile::TempDir;

    fn pipeline(args: &[&str]) -> PipelineArgs {
        let parsed = Args::try_parse_from(
            ["aemet-stations", "fetch"].into_iter().chain(args.iter().copied()),
        )
        .unwrap();
        match parsed.command {
            Some(Commands::Fetch(fetch)) => fetch.pipeline,
            _ => panic!("expected fetch command"),
        }
    }

    fn records() -> Vec<RawStationRecord> {
        let station = |id: &str, name: &str, province: &str, altitude: &str, lat: &str, lon: &str| {
            RawStationRecord::new()
                .with("indicativo", id)
                .with("nombre", name)
                .with("provincia", province)
                .with("altitud", altitude)
                .with("latitud", lat)
                .with("longitud", lon)
        };
        vec![
            station("3195", "MADRID, RETIRO", "MADRID", "667", "402443N", "034041W"),
            station("3129", "MADRID AEROPUERTO", "MADRID", "609", "402800N", "033320W"),
            station("0076", "BARCELONA AEROPUERTO", "BARCELONA", "4", "411734N", "020412E"),
            station("9999", "BROKEN", "MADRID", "10", "3725N", "034041W"),
        ]
    }

    #[test]
    fn test_process_records_with_province_filter() {
        let config = Config::default();
        let report =
            process_records("test", &records(), &config, &pipeline(&["-p", "MADRID", "--list"]))
                .unwrap();

        assert_eq!(report.summary.total_input, 4);
        assert_eq!(report.summary.accepted, 3);
        assert_eq!(report.province.as_deref(), Some("MADRID"));
        assert_eq!(report.metrics.total_stations, 2);
        assert_eq!(report.metrics.total_provinces, 1);
        assert_eq!(report.metrics.average_altitude, Some(638.0));
        assert_eq!(report.stations.len(), 2);
        assert_eq!(report.stations[0].label, "MADRID, RETIRO (MADRID)");
        assert_eq!(report.stations[0].display.name, "Madrid, Retiro");
        assert!(report.export.is_none());
    }

    #[test]
    fn test_process_records_exports_selection() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("barcelona.csv");
        let output_arg = output.to_str().unwrap();

        let report = process_records(
            "test",
            &records(),
            &Config::default(),
            &pipeline(&["--province", "BARCELONA", "-o", output_arg]),
        )
        .unwrap();

        let export = report.export.unwrap();
        assert_eq!(export.rows, 1);
        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(contents.contains("0076"));
        assert!(!contents.contains("3195"));
    }

    #[test]
    fn test_schema_failure_is_an_error() {
        let records = vec![RawStationRecord::new().with("nombre", "A")];
        let err =
            process_records("test", &records, &Config::default(), &pipeline(&[])).unwrap_err();
        assert!(matches!(err, StationError::InvalidPayload { .. }));
    }

    #[test]
    fn test_report_serializes() {
        let report =
            process_records("test", &records(), &Config::default(), &pipeline(&[])).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["summary"]["accepted"], json!(3));
        assert_eq!(value["metrics"]["total_provinces"], json!(2));
        assert!(value.get("stations").is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::try_parse_from([
            "aemet-stations",
            "fetch",
            "-o",
            "out.parquet",
            "--compression",
            "zstd",
            "--coordinate-decimals",
            "3",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_cli_overrides(&mut config, args.command.as_ref().unwrap());

        assert_eq!(config.export.format, ExportFormat::Parquet);
        assert_eq!(
            config.export.compression,
            crate::config::CompressionAlgorithm::Zstd
        );
        assert_eq!(config.normalizer.coordinate_decimals, 3);
    }

    #[tokio::test]
    async fn test_fetch_records_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stations.json");
        std::fs::write(&path, "[]").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        // Either branch may win once the token is already cancelled
        let result = fetch_records(&JsonFileSource::new(&path), None, &token).await;
        match result {
            Ok(records) => assert!(records.is_empty()),
            Err(e) => assert!(matches!(e, StationError::Interrupted { .. })),
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(21.44), "°C"), "21.4°C");
        assert_eq!(format_value(None, "%"), "n/a");
    }
}
