//! ---
//! cep_section: "05-pipeline-cli"
//! cep_subsection: "binary"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Telemetry generation command."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cep_common::{AppConfig, SimulationConfig};
use cep_ingest::AssetRegistryFile;
use cep_persistence::{open_sink, write_batch, SinkFormat, TelemetrySink};
use cep_sim::{AssetSource, GenerationOutcome, SimulationMetrics, TelemetryGenerator};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use prometheus::{Encoder, Registry, TextEncoder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

impl From<OutputFormat> for SinkFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => SinkFormat::Csv,
            OutputFormat::Jsonl => SinkFormat::Jsonl,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TelemetryArgs {
    /// Asset registry table to read assets from
    #[arg(long, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Telemetry fact table to append to
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output encoding when the extension is ambiguous
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Random seed for the sensor noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hours to simulate per asset
    #[arg(long)]
    pub hours: Option<u32>,

    /// Simulate assets on worker threads
    #[arg(long)]
    pub parallel: bool,

    /// Write Prometheus text exposition of the run to this file
    #[arg(long, value_name = "FILE")]
    pub metrics_out: Option<PathBuf>,
}

/// What a publish step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The registry was empty; the sink was never opened.
    NothingToGenerate,
    Published { assets: usize, records: usize },
}

pub fn run(args: &TelemetryArgs, config: &AppConfig) -> Result<PublishOutcome> {
    let simulation = effective_simulation(args, &config.simulation)?;
    let registry_path = args
        .registry
        .clone()
        .unwrap_or_else(|| config.paths.asset_registry_csv.clone());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.paths.telemetry_output.clone());
    let format = args
        .format
        .map(SinkFormat::from)
        .unwrap_or_else(|| SinkFormat::from_path(&output));

    let metrics_registry = Arc::new(Registry::new());
    let generator = TelemetryGenerator::from_config(&simulation)
        .context("invalid simulation parameters")?
        .with_metrics(SimulationMetrics::new(metrics_registry.clone())?);
    let source = AssetRegistryFile::new(&registry_path);
    let mut sink = open_sink(&output, format);
    let seed = simulation.seed.unwrap_or_else(rand::random);
    info!(
        seed,
        registry = %registry_path.display(),
        output = %output.display(),
        parallel = simulation.parallel,
        "telemetry run configured"
    );

    let outcome = publish(
        &source,
        &generator,
        &mut sink,
        Utc::now(),
        seed,
        simulation.parallel,
    )
    .with_context(|| format!("telemetry run against {} failed", output.display()))?;

    if let Some(path) = &args.metrics_out {
        write_metrics(&metrics_registry, path)?;
    }
    Ok(outcome)
}

/// Command-line overrides applied on top of the configured simulation.
fn effective_simulation(args: &TelemetryArgs, base: &SimulationConfig) -> Result<SimulationConfig> {
    let mut simulation = base.clone();
    if let Some(hours) = args.hours {
        simulation.simulation_hours = hours;
    }
    if args.seed.is_some() {
        simulation.seed = args.seed;
    }
    simulation.parallel |= args.parallel;
    simulation.validate()?;
    Ok(simulation)
}

/// Pull assets, generate their telemetry and append it to `sink` in one batch.
///
/// An empty registry short-circuits before the sink is touched so that no
/// zero-row write can pass for a completed run.
pub fn publish<A, S>(
    source: &A,
    generator: &TelemetryGenerator,
    sink: &mut S,
    anchor: DateTime<Utc>,
    seed: u64,
    parallel: bool,
) -> Result<PublishOutcome>
where
    A: AssetSource + ?Sized,
    S: TelemetrySink + ?Sized,
{
    let assets = source.assets().context("failed to read asset registry")?;
    let outcome = if parallel {
        generator.generate_parallel(&assets, anchor, seed)?
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        generator.generate(&assets, anchor, &mut rng)?
    };
    let records = match outcome {
        GenerationOutcome::NothingToGenerate => {
            warn!("no assets found, run asset synthesis first");
            return Ok(PublishOutcome::NothingToGenerate);
        }
        GenerationOutcome::Generated(records) => records,
    };
    let written = write_batch(sink, &records)?;
    info!(
        sink = sink.name(),
        assets = assets.len(),
        records = written,
        "telemetry committed"
    );
    Ok(PublishOutcome::Published {
        assets: assets.len(),
        records: written,
    })
}

fn write_metrics(registry: &Registry, path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, buffer)
        .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    Ok(())
}
