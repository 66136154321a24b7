//! spikectl - command line client for spike alert settings.
//!
//! Inspect, validate, migrate and save a user's alert strategies.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::ConnectionArgs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

/// Spike alert settings CLI
#[derive(Parser, Debug)]
#[command(name = "spikectl")]
#[command(about = "Manage spike alert strategies and settings", long_about = None)]
struct Args {
    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and print the stored settings
    Show,
    /// Check an options file for strategies missing their own filters
    Validate {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print strategy descriptions from an options file
    Describe {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Render a message template with example values
    Preview { template: String },
    /// Print an options file in the current format
    Migrate {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Validate and upload an options file
    Save {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Send a Telegram test message
    Test,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);
    debug!(command = ?args.command, "spikectl starting");

    let result = match &args.command {
        Command::Show => commands::show(&args.connection).await,
        Command::Validate { file } => commands::validate_file(file).await,
        Command::Describe { file } => commands::describe_file(file).await,
        Command::Preview { template } => {
            commands::preview(template);
            Ok(())
        }
        Command::Migrate { file } => commands::migrate_file(file).await,
        Command::Save { file } => commands::save_file(&args.connection, file).await,
        Command::Test => commands::test_connection(&args.connection).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
