//! ---
//! cep_section: "05-pipeline-cli"
//! cep_subsection: "binary"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Batch entry point for the predictive maintenance pipeline."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::Result;
use cep_common::{init_tracing, AppConfig};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tracing::info;

mod fleet;
mod ingest;
mod telemetry;

const SERVICE_NAME: &str = "cep-pipeline";
const CONFIG_CANDIDATES: &[&str] = &["cep.toml", "configs/cep.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Construction equipment predictive maintenance pipeline",
    long_about = None
)]
struct Cli {
    /// Configuration file. Defaults to $CEP_CONFIG, ./cep.toml or ./configs/cep.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print version information and exit
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,

    /// Raise the configured log level (-v debug, -vv trace). CEP_LOG still wins
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Normalise the raw project schedule into the staging table")]
    Ingest(ingest::IngestArgs),
    #[command(about = "Bridge staged projects to machine assets")]
    Synthesize(ingest::SynthesizeArgs),
    #[command(about = "Simulate wear telemetry for every registered asset")]
    Telemetry(telemetry::TelemetryArgs),
    #[command(about = "Run ingest, synthesize and telemetry in sequence")]
    Run(RunArgs),
    #[command(about = "Show the latest health status of every asset")]
    FleetHealth(fleet::FleetArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    #[command(flatten)]
    ingest: ingest::IngestArgs,
    #[command(flatten)]
    telemetry: telemetry::TelemetryArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{} {}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = verbosity_level(cli.verbose) {
        config.logging.level = level.to_owned();
    }
    init_tracing(SERVICE_NAME, &config.logging)?;

    match command {
        Commands::Ingest(args) => {
            ingest::run_ingest(&args, &config.paths)?;
        }
        Commands::Synthesize(args) => {
            ingest::run_synthesize(&args, &config.paths)?;
        }
        Commands::Telemetry(args) => {
            telemetry::run(&args, &config)?;
        }
        Commands::Run(args) => run_pipeline(&args, &config)?,
        Commands::FleetHealth(args) => fleet::run(&args, &config.paths)?,
    }
    Ok(())
}

fn verbosity_level(count: u8) -> Option<&'static str> {
    match count {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::from_path(path),
        None => AppConfig::load(CONFIG_CANDIDATES),
    }
}

fn run_pipeline(args: &RunArgs, config: &AppConfig) -> Result<()> {
    info!("starting ingestion pipeline");
    ingest::run_ingest(&args.ingest, &config.paths)?;
    let synthesize = ingest::SynthesizeArgs {
        staging: args.ingest.staging.clone(),
        registry: args.telemetry.registry.clone(),
    };
    ingest::run_synthesize(&synthesize, &config.paths)?;
    let outcome = telemetry::run(&args.telemetry, config)?;
    info!(outcome = ?outcome, "pipeline execution finished");
    Ok(())
}
