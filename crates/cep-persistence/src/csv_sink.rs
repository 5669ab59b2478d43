//! ---
//! cep_section: "03-persistence-logging"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "CSV fact table sink and reader."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use cep_sim::TelemetryRecord;
use csv::{ReaderBuilder, Writer, WriterBuilder};

use crate::sink::TelemetrySink;
use crate::{PersistenceError, Result};

/// Appends records to a CSV file, writing the header only into a new or empty file.
#[derive(Debug)]
pub struct CsvTelemetrySink {
    path: PathBuf,
    writer: Option<Writer<File>>,
}

impl CsvTelemetrySink {
    /// Sink targeting `path`. Nothing is opened until a session acquires it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for CsvTelemetrySink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn acquire(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = Some(
            WriterBuilder::new()
                .has_headers(needs_header)
                .from_writer(file),
        );
        Ok(())
    }

    fn append(&mut self, records: &[TelemetryRecord]) -> Result<usize> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(PersistenceError::NotAcquired("csv"))?;
        for record in records {
            writer.serialize(record)?;
        }
        Ok(records.len())
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Load every record from a CSV fact table.
pub fn read_telemetry_csv(path: &Path) -> Result<Vec<TelemetryRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let records = reader
        .deserialize::<TelemetryRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}
