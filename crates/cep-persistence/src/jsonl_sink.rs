//! ---
//! cep_section: "03-persistence-logging"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "JSON-lines telemetry log sink and reader."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use cep_sim::TelemetryRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sink::TelemetrySink;
use crate::{PersistenceError, Result};

/// Current layout version written into new telemetry logs.
pub const TELEMETRY_LOG_VERSION: u16 = 1;

const LOG_KIND: &str = "cep-telemetry";

/// First line of every telemetry log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TelemetryLogHeader {
    kind: String,
    version: u16,
    created_at: DateTime<Utc>,
}

impl TelemetryLogHeader {
    fn new() -> Self {
        Self {
            kind: LOG_KIND.to_owned(),
            version: TELEMETRY_LOG_VERSION,
            created_at: Utc::now(),
        }
    }
}

/// Append-only JSON-lines log of telemetry records.
pub struct JsonlTelemetrySink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl JsonlTelemetrySink {
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

impl std::fmt::Debug for JsonlTelemetrySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlTelemetrySink")
            .field("path", &self.path)
            .field("acquired", &self.writer.is_some())
            .finish()
    }
}

impl TelemetrySink for JsonlTelemetrySink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn acquire(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let is_new = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        if is_new {
            serde_json::to_writer(&mut writer, &TelemetryLogHeader::new())?;
            writer.write_all(b"\n")?;
        }
        self.writer = Some(writer);
        Ok(())
    }

    fn append(&mut self, records: &[TelemetryRecord]) -> Result<usize> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(PersistenceError::NotAcquired("jsonl"))?;
        for record in records {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
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

/// Load every record from a telemetry log, validating its header.
pub fn read_telemetry_jsonl(path: &Path) -> Result<Vec<TelemetryRecord>> {
    let mut lines = BufReader::new(File::open(path)?).lines();
    let header = match lines.next() {
        Some(line) => serde_json::from_str::<TelemetryLogHeader>(&line?).ok(),
        None => return Ok(Vec::new()),
    };
    if !header.is_some_and(|header| header.kind == LOG_KIND) {
        return Err(PersistenceError::InvalidHeader(path.to_path_buf()));
    }
    let mut records = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::write_batch;
    use anyhow::Result;
    use cep_sim::HealthStatus;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(asset_id: u64, status_code: HealthStatus) -> TelemetryRecord {
        TelemetryRecord {
            asset_id,
            timestamp: Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap(),
            vibration_level: 4.31,
            temperature_c: 88.05,
            status_code,
        }
    }

    #[test]
    fn header_written_once_across_sessions() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fact_telemetry.jsonl");
        let mut sink = JsonlTelemetrySink::new(&path);
        write_batch(&mut sink, &[record(1, HealthStatus::Danger)])?;
        write_batch(&mut sink, &[record(2, HealthStatus::Warning)])?;

        let contents = fs::read_to_string(&path)?;
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(contents.matches(LOG_KIND).count(), 1);
        assert!(contents.contains("\"status_code\":\"Danger\""));

        let records = read_telemetry_jsonl(&path)?;
        assert_eq!(
            records,
            vec![
                record(1, HealthStatus::Danger),
                record(2, HealthStatus::Warning)
            ]
        );
        Ok(())
    }

    #[test]
    fn foreign_files_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("other.jsonl");
        fs::write(&path, "{\"hello\":1}\n")?;
        let err = read_telemetry_jsonl(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidHeader(_)));
        Ok(())
    }
}
