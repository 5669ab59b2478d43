//! ---
//! cep_section: "11-simulation"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Asset, reading and telemetry record types."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Identifier minted by the asset registry.
pub type AssetId = u64;

/// Equipment asset the simulation produces telemetry for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: AssetId,
    pub asset_tag: String,
}

impl Asset {
    pub fn new(asset_id: AssetId, asset_tag: impl Into<String>) -> Self {
        Self {
            asset_id,
            asset_tag: asset_tag.into(),
        }
    }
}

/// Physical sensor channel sampled on every asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SensorChannel {
    Vibration,
    Temperature,
}

/// Instantaneous sensor reading for one asset at one hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub vibration: f64,
    pub temperature: f64,
}

impl Reading {
    pub fn new(vibration: f64, temperature: f64) -> Self {
        Self {
            vibration,
            temperature,
        }
    }

    /// Round both channels to the persisted precision.
    pub fn rounded(&self) -> Self {
        Self {
            vibration: round_hundredths(self.vibration),
            temperature: round_hundredths(self.temperature),
        }
    }
}

/// Round to two decimal places.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Health level assigned to a reading. Ordered from healthiest to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum HealthStatus {
    #[default]
    Operational,
    Warning,
    Danger,
}

/// One hourly telemetry sample handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub asset_id: AssetId,
    pub timestamp: DateTime<Utc>,
    pub vibration_level: f64,
    pub temperature_c: f64,
    pub status_code: HealthStatus,
}

impl TelemetryRecord {
    pub fn reading(&self) -> Reading {
        Reading::new(self.vibration_level, self.temperature_c)
    }
}
