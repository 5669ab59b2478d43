//! ---
//! cep_section: "02-ingestion"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Error type for staging and registry operations."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("schedule file not found: {0}")]
    ScheduleNotFound(PathBuf),
    #[error("schedule header has {found} columns, at least {required} expected")]
    NarrowSchedule { found: usize, required: usize },
}
