//! ---
//! cep_section: "05-pipeline-cli"
//! cep_subsection: "binary"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Fleet health report command."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use cep_common::PathsConfig;
use cep_ingest::{read_staging, AssetRegistry};
use cep_persistence::{fleet_health, read_telemetry, FleetHealthEntry, SinkFormat};
use cep_sim::HealthStatus;
use clap::Args;
use tabled::settings::object::{Cell, Rows};
use tabled::settings::{Alignment, Color, Modify, Panel, Style};
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Args)]
pub struct FleetArgs {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Telemetry fact table to read (defaults to the configured output)
    #[arg(long, value_name = "FILE")]
    pub telemetry: Option<PathBuf>,

    /// Print the status column without severity colours
    #[arg(long)]
    pub no_color: bool,
}

const STATUS_COLUMN: usize = 5;

#[derive(Tabled)]
struct FleetRow {
    #[tabled(rename = "Asset")]
    asset_tag: String,
    #[tabled(rename = "Project")]
    project_name: String,
    #[tabled(rename = "Borough")]
    borough: String,
    #[tabled(rename = "Vibration")]
    vibration_level: f64,
    #[tabled(rename = "Temp (C)")]
    temperature_c: f64,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Seen (UTC)")]
    last_seen: String,
}

impl From<&FleetHealthEntry> for FleetRow {
    fn from(entry: &FleetHealthEntry) -> Self {
        Self {
            asset_tag: entry.asset_tag.clone(),
            project_name: entry.project_name.clone(),
            borough: entry.borough.clone(),
            vibration_level: entry.vibration_level,
            temperature_c: entry.temperature_c,
            status: entry.status_code.to_string(),
            last_seen: entry.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

pub fn run(args: &FleetArgs, paths: &PathsConfig) -> Result<()> {
    let entries = load(args, paths)?;
    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &entries)?;
        stdout.write_all(b"\n")?;
    } else {
        let colored = !args.no_color && stdout.is_terminal();
        writeln!(stdout, "{}", render_table(&entries, colored))?;
    }
    Ok(())
}

fn load(args: &FleetArgs, paths: &PathsConfig) -> Result<Vec<FleetHealthEntry>> {
    let telemetry = args.telemetry.as_ref().unwrap_or(&paths.telemetry_output);
    let projects = read_staging(&paths.staging_csv).with_context(|| {
        format!("failed to read staging table {}", paths.staging_csv.display())
    })?;
    let registry = AssetRegistry::load(&paths.asset_registry_csv).with_context(|| {
        format!(
            "failed to load asset registry {}",
            paths.asset_registry_csv.display()
        )
    })?;
    let records = read_telemetry(telemetry, SinkFormat::from_path(telemetry))
        .with_context(|| format!("failed to read telemetry {}", telemetry.display()))?;
    Ok(fleet_health(&projects, &registry, &records))
}

fn status_color(status: HealthStatus) -> Color {
    match status {
        HealthStatus::Operational => Color::FG_GREEN,
        HealthStatus::Warning => Color::FG_YELLOW,
        HealthStatus::Danger => Color::FG_RED,
    }
}

fn render_table(entries: &[FleetHealthEntry], colored: bool) -> String {
    let rows: Vec<FleetRow> = entries.iter().map(FleetRow::from).collect();
    let mut table = Table::new(&rows);
    if colored {
        // Row 0 is the column header until the panel is added.
        for (index, entry) in entries.iter().enumerate() {
            table.with(
                Modify::new(Cell::new(index + 1, STATUS_COLUMN))
                    .with(status_color(entry.status_code)),
            );
        }
    }
    table
        .with(Panel::header("Fleet Health"))
        .with(Style::sharp())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string()
}
