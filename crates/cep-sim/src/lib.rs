//! ---
//! cep_section: "11-simulation"
//! cep_subsection: "01-bootstrap"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Telemetry engine module exports and shared types."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
//! Synthetic equipment telemetry: a linear wear model with Gaussian jitter,
//! a threshold ladder for health classification and a generator that walks
//! every asset through the simulation window.

pub mod classifier;
pub mod degradation;
pub mod errors;
pub mod generator;
pub mod metrics;
pub mod records;
pub mod source;

pub use classifier::{HealthClassifier, ThresholdRule};
pub use degradation::{DegradationModel, DegradationParams};
pub use errors::{Result, SimError};
pub use generator::{asset_stream_seed, GenerationOutcome, TelemetryGenerator};
pub use metrics::SimulationMetrics;
pub use records::{
    round_hundredths, Asset, AssetId, HealthStatus, Reading, SensorChannel, TelemetryRecord,
};
pub use source::AssetSource;
