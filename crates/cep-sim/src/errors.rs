//! ---
//! cep_section: "11-simulation"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Error taxonomy for the telemetry engine."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use thiserror::Error;

use crate::records::SensorChannel;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid simulation parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("noise distribution rejected parameters: {0}")]
    Distribution(#[from] rand_distr::NormalError),
    #[error("non-finite {channel} reading at hour {hour}")]
    NonFiniteReading { channel: SensorChannel, hour: u32 },
    #[error("simulation worker panicked while processing asset batch {batch}")]
    WorkerPanicked { batch: usize },
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
