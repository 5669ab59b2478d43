//! ---
//! cep_section: "03-persistence-logging"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Telemetry sinks and fact table read models."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Durable sinks for generated telemetry plus the readers and the fleet
//! health view built on top of the persisted fact table.

use std::path::{Path, PathBuf};

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing fact files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for CSV encoding and decoding issues.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// A sink was written to outside of an acquired session.
    #[error("sink {0} used without an acquired session")]
    NotAcquired(&'static str),
    /// The telemetry log does not start with a recognised header.
    #[error("telemetry log {0} has a missing or invalid header")]
    InvalidHeader(PathBuf),
    /// The backing store rejected the write.
    #[error("sink write failed: {0}")]
    WriteFailed(String),
}

pub mod csv_sink;
pub mod fleet;
pub mod jsonl_sink;
pub mod memory;
pub mod sink;

pub use csv_sink::{read_telemetry_csv, CsvTelemetrySink};
pub use fleet::{fleet_health, FleetHealthEntry};
pub use jsonl_sink::{read_telemetry_jsonl, JsonlTelemetrySink, TELEMETRY_LOG_VERSION};
pub use memory::MemorySink;
pub use sink::{write_batch, SinkSession, TelemetrySink};

use cep_sim::TelemetryRecord;

/// On-disk encodings of the telemetry fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    /// Comma separated with a header row.
    Csv,
    /// Header line followed by one JSON record per line.
    Jsonl,
}

impl SinkFormat {
    /// Infer the format from the file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") | Some("ndjson") => SinkFormat::Jsonl,
            _ => SinkFormat::Csv,
        }
    }
}

/// Construct the file sink for `format` at `path`.
pub fn open_sink(path: &Path, format: SinkFormat) -> Box<dyn TelemetrySink> {
    match format {
        SinkFormat::Csv => Box::new(CsvTelemetrySink::new(path)),
        SinkFormat::Jsonl => Box::new(JsonlTelemetrySink::new(path)),
    }
}

/// Read back a fact table written by [`open_sink`].
pub fn read_telemetry(path: &Path, format: SinkFormat) -> Result<Vec<TelemetryRecord>> {
    match format {
        SinkFormat::Csv => read_telemetry_csv(path),
        SinkFormat::Jsonl => read_telemetry_jsonl(path),
    }
}
