//! ---
//! cep_section: "03-persistence-logging"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Latest health snapshot per asset."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::collections::{BTreeMap, HashMap};

use cep_ingest::{AssetRegistry, ProjectRecord};
use cep_sim::{AssetId, HealthStatus, TelemetryRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Most recent telemetry of one asset joined with its project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetHealthEntry {
    /// Registry identifier.
    pub asset_id: AssetId,
    /// Machine tag.
    pub asset_tag: String,
    /// Name of the bridged capital project.
    pub project_name: String,
    /// Borough of the bridged capital project.
    pub borough: String,
    /// Latest vibration level.
    pub vibration_level: f64,
    /// Latest temperature.
    pub temperature_c: f64,
    /// Status stored with the latest record.
    pub status_code: HealthStatus,
    /// Time of the latest record.
    pub timestamp: DateTime<Utc>,
}

/// Latest record per asset, ordered by asset id.
///
/// Assets without a staged project or without telemetry are left out. When a
/// project id is staged more than once the first row is used.
pub fn fleet_health(
    projects: &[ProjectRecord],
    registry: &AssetRegistry,
    records: &[TelemetryRecord],
) -> Vec<FleetHealthEntry> {
    let mut project_index: HashMap<&str, &ProjectRecord> = HashMap::new();
    for project in projects {
        project_index
            .entry(project.project_id.as_str())
            .or_insert(project);
    }

    let mut latest: HashMap<AssetId, &TelemetryRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.asset_id)
            .and_modify(|current| {
                if record.timestamp > current.timestamp {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    let mut entries = BTreeMap::new();
    for asset in registry.records() {
        let (Some(project), Some(record)) = (
            project_index.get(asset.nyc_project_id.as_str()),
            latest.get(&asset.asset_id),
        ) else {
            continue;
        };
        entries.insert(
            asset.asset_id,
            FleetHealthEntry {
                asset_id: asset.asset_id,
                asset_tag: asset.asset_tag.clone(),
                project_name: project.project_name.clone(),
                borough: project.borough.clone(),
                vibration_level: record.vibration_level,
                temperature_c: record.temperature_c,
                status_code: record.status_code,
                timestamp: record.timestamp,
            },
        );
    }
    entries.into_values().collect()
}
