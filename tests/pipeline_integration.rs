//! ---
//! cep_section: "15-testing-qa-runbook"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "End-to-end staging, synthesis, telemetry and fleet health."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::collections::HashSet;

use anyhow::Result;
use cep_common::{AppConfig, SimulationConfig};
use cep_ingest::{
    normalize_schedule, read_staging, write_staging, AssetRegistry, AssetRegistryFile,
};
use cep_persistence::{
    fleet_health, read_telemetry, write_batch, CsvTelemetrySink, JsonlTelemetrySink, MemorySink,
    SinkFormat,
};
use cep_sim::{AssetSource, GenerationOutcome, HealthStatus, TelemetryGenerator};
use cep_tests::{DISTINCT_PROJECTS, SCHEDULE_CSV};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 6, 0, 0).unwrap()
}

#[test]
fn schedule_to_fleet_health() -> Result<()> {
    let dir = tempdir()?;
    let staging_path = dir.path().join("staging/raw_nyc_projects.csv");
    let registry_path = dir.path().join("asset_intelligence/dim_assets.csv");
    let telemetry_path = dir.path().join("asset_intelligence/fact_telemetry.csv");

    // Staging.
    let projects = normalize_schedule(SCHEDULE_CSV.as_bytes())?;
    assert_eq!(projects.len(), 5);
    write_staging(&staging_path, &projects)?;
    let staged = read_staging(&staging_path)?;
    assert_eq!(staged, projects);

    // Asset synthesis is idempotent on tags.
    let mut registry = AssetRegistry::load(&registry_path)?;
    assert_eq!(registry.synthesize(&staged), DISTINCT_PROJECTS);
    registry.save(&registry_path)?;
    let mut reloaded = AssetRegistry::load(&registry_path)?;
    assert_eq!(reloaded.synthesize(&staged), 0);

    // Telemetry.
    let assets = AssetRegistryFile::new(&registry_path).assets()?;
    assert_eq!(assets.len(), DISTINCT_PROJECTS);
    let generator = TelemetryGenerator::from_config(&SimulationConfig::default())?;
    let mut rng = StdRng::seed_from_u64(2024);
    let records = generator
        .generate(&assets, anchor(), &mut rng)?
        .into_records();
    assert_eq!(records.len(), DISTINCT_PROJECTS * 500);

    let mut sink = CsvTelemetrySink::new(&telemetry_path);
    assert_eq!(write_batch(&mut sink, &records)?, records.len());
    let persisted = read_telemetry(&telemetry_path, SinkFormat::Csv)?;
    assert_eq!(persisted, records);

    // Fleet health reports the final hour of every asset.
    let fleet = fleet_health(&staged, &reloaded, &persisted);
    assert_eq!(fleet.len(), DISTINCT_PROJECTS);
    for entry in &fleet {
        assert_eq!(entry.timestamp, anchor() - Duration::hours(1));
    }
    assert_eq!(fleet[0].asset_tag, "MACH-P-100");
    assert_eq!(fleet[0].borough, "Manhattan");
    Ok(())
}

#[test]
fn every_asset_hour_pair_is_present_once() -> Result<()> {
    let config: AppConfig = "[simulation]\nsimulation_hours = 72\nseed = 5".parse()?;
    let generator = TelemetryGenerator::from_config(&config.simulation)?;
    let mut registry = AssetRegistry::new();
    registry.synthesize(&normalize_schedule(SCHEDULE_CSV.as_bytes())?);
    let assets = registry.assets()?;

    let seed = config.simulation.seed.unwrap_or_default();
    let records = generator
        .generate(&assets, anchor(), &mut StdRng::seed_from_u64(seed))?
        .into_records();
    assert_eq!(records.len(), assets.len() * 72);

    let pairs: HashSet<_> = records
        .iter()
        .map(|record| {
            let hour = 72 - (anchor() - record.timestamp).num_hours();
            (record.asset_id, hour)
        })
        .collect();
    assert_eq!(pairs.len(), records.len());
    for asset in &assets {
        for hour in 0..72 {
            assert!(pairs.contains(&(asset.asset_id, hour)));
        }
    }
    Ok(())
}

#[test]
fn accelerated_wear_reaches_danger_and_statuses_agree() -> Result<()> {
    let simulation = SimulationConfig {
        vibe_slope_coeff: 0.02,
        temp_slope_coeff: 0.03,
        ..Default::default()
    };
    let generator = TelemetryGenerator::from_config(&simulation)?;
    let assets = vec![cep_sim::Asset::new(1, "MACH-WEAR")];
    let records = generator
        .generate_parallel(&assets, anchor(), 17)?
        .into_records();

    assert_eq!(records.first().map(|r| r.status_code), Some(HealthStatus::Operational));
    assert_eq!(records.last().map(|r| r.status_code), Some(HealthStatus::Danger));
    for record in &records {
        assert_eq!(
            generator.classifier().classify(&record.reading()),
            record.status_code
        );
    }
    Ok(())
}

#[test]
fn empty_registry_produces_no_batch() -> Result<()> {
    let dir = tempdir()?;
    let source = AssetRegistryFile::new(dir.path().join("dim_assets.csv"));
    let generator = TelemetryGenerator::from_config(&SimulationConfig::default())?;
    let outcome = generator.generate(&source.assets()?, anchor(), &mut StdRng::seed_from_u64(1))?;
    assert_eq!(outcome, GenerationOutcome::NothingToGenerate);

    let mut sink = MemorySink::new();
    if let GenerationOutcome::Generated(records) = outcome {
        write_batch(&mut sink, &records)?;
    }
    assert_eq!(sink.acquisitions(), 0);
    Ok(())
}

#[test]
fn jsonl_sink_appends_runs_in_order() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("fact_telemetry.jsonl");
    let simulation = SimulationConfig {
        simulation_hours: 5,
        ..Default::default()
    };
    let generator = TelemetryGenerator::from_config(&simulation)?;
    let assets = vec![cep_sim::Asset::new(4, "MACH-4"), cep_sim::Asset::new(2, "MACH-2")];

    let mut sink = JsonlTelemetrySink::new(&path);
    let first = generator
        .generate(&assets, anchor(), &mut StdRng::seed_from_u64(1))?
        .into_records();
    let second = generator
        .generate(&assets, anchor() + Duration::hours(5), &mut StdRng::seed_from_u64(2))?
        .into_records();
    write_batch(&mut sink, &first)?;
    write_batch(&mut sink, &second)?;

    let persisted = read_telemetry(&path, SinkFormat::from_path(&path))?;
    let mut expected = first;
    expected.extend(second);
    assert_eq!(persisted, expected);
    assert_eq!(persisted[0].asset_id, 4);
    assert_eq!(persisted[5].asset_id, 2);
    Ok(())
}
