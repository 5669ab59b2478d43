//! ---
//! cep_section: "05-pipeline-cli"
//! cep_subsection: "binary"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Staging and asset synthesis commands."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use cep_common::PathsConfig;
use cep_ingest::{load_schedule, read_staging, write_staging, AssetRegistry};
use clap::Args;
use tracing::info;

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    /// Raw capital project schedule CSV
    #[arg(long, value_name = "FILE")]
    pub schedule: Option<PathBuf>,

    /// Staging table to replace
    #[arg(long, value_name = "FILE")]
    pub staging: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SynthesizeArgs {
    /// Staging table to read projects from
    #[arg(long, value_name = "FILE")]
    pub staging: Option<PathBuf>,

    /// Asset registry table to extend
    #[arg(long, value_name = "FILE")]
    pub registry: Option<PathBuf>,
}

pub fn run_ingest(args: &IngestArgs, paths: &PathsConfig) -> Result<usize> {
    let schedule = args.schedule.as_ref().unwrap_or(&paths.schedule_csv);
    let staging = args.staging.as_ref().unwrap_or(&paths.staging_csv);
    let projects = load_schedule(schedule)
        .with_context(|| format!("failed to ingest schedule {}", schedule.display()))?;
    let written = write_staging(staging, &projects)
        .with_context(|| format!("failed to write staging table {}", staging.display()))?;
    info!(schedule = %schedule.display(), staging = %staging.display(), records = written, "staging complete");
    Ok(written)
}

pub fn run_synthesize(args: &SynthesizeArgs, paths: &PathsConfig) -> Result<usize> {
    let staging = args.staging.as_ref().unwrap_or(&paths.staging_csv);
    let registry_path = args.registry.as_ref().unwrap_or(&paths.asset_registry_csv);
    let projects = read_staging(staging)
        .with_context(|| format!("failed to read staging table {}", staging.display()))?;
    let mut registry = AssetRegistry::load(registry_path)
        .with_context(|| format!("failed to load asset registry {}", registry_path.display()))?;
    let inserted = registry.synthesize(&projects);
    registry
        .save(registry_path)
        .with_context(|| format!("failed to save asset registry {}", registry_path.display()))?;
    info!(registry = %registry_path.display(), inserted, total = registry.len(), "asset synthesis complete");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn ingest_then_synthesize_builds_registry() -> Result<()> {
        let dir = tempdir()?;
        let schedule = dir.path().join("schedule.csv");
        fs::write(
            &schedule,
            "id,name,desc,borough,phase,end\nP1,Pier,x,Bronx,Design,01/02/2024\nP2,Pool,y,Queens,Design,\nP1,Pier,x,Bronx,Construction,05/06/2025\n",
        )?;
        let paths = PathsConfig {
            schedule_csv: schedule,
            staging_csv: dir.path().join("staging.csv"),
            asset_registry_csv: dir.path().join("dim_assets.csv"),
            telemetry_output: dir.path().join("fact.csv"),
        };
        let ingest = IngestArgs {
            schedule: None,
            staging: None,
        };
        assert_eq!(run_ingest(&ingest, &paths)?, 3);

        let synth = SynthesizeArgs {
            staging: None,
            registry: None,
        };
        assert_eq!(run_synthesize(&synth, &paths)?, 2);
        assert_eq!(run_synthesize(&synth, &paths)?, 0);
        assert_eq!(AssetRegistry::load(&paths.asset_registry_csv)?.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_schedule_fails_with_context() {
        let paths = PathsConfig {
            schedule_csv: PathBuf::from("does/not/exist.csv"),
            ..Default::default()
        };
        let args = IngestArgs {
            schedule: None,
            staging: None,
        };
        let err = run_ingest(&args, &paths).unwrap_err();
        assert!(format!("{err:#}").contains("schedule file not found"));
    }
}
