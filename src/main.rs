use aemet_stations::cli::{args::Args, commands};
use anyhow::Context;
use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let command_name = args.command.as_ref().map_or("command", |command| command.name());

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        let shutdown_signal = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("Failed to install CTRL+C signal handler: {}", e);
                std::future::pending::<()>().await;
            }
            cancellation_token.cancel();
        };

        tokio::select! {
            result = commands::run(args, cancellation_token.clone()) => {
                result
            }
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(aemet_stations::StationError::interrupted(
                    "Interrupted by user",
                ))
            }
        }
    })
    .with_context(|| format!("{} failed", command_name));

    match result {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("AEMET Stations - Weather Station Inventory Normalizer");
    println!("=====================================================");
    println!();
    println!("Normalize the AEMET OpenData weather-station inventory: decode DMS");
    println!("coordinates, drop malformed rows and report station metrics.");
    println!();
    println!("USAGE:");
    println!("    aemet-stations <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    normalize   Normalize a station inventory saved as JSON");
    println!("    fetch       Fetch the inventory from AEMET OpenData and normalize it");
    println!("    observe     Show the latest observation for station ids");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Increase logging verbosity");
    println!("    -q, --quiet      Only show errors");
    println!("    -c, --config     Path to a JSON config file");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Normalize a saved inventory and export Madrid stations:");
    println!("    aemet-stations normalize --input stations.json --province MADRID -o madrid.csv");
    println!();
    println!("    # Fetch the live inventory (needs AEMET_API_KEY):");
    println!("    aemet-stations fetch --report json");
    println!();
    println!("    # Latest observations for two stations:");
    println!("    aemet-stations observe 3195 0076");
    println!();
    println!("For detailed help on any command, use:");
    println!("    aemet-stations <COMMAND> --help");
}
