//! ---
//! cep_section: "03-persistence-logging"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "In-memory sink for tests and dry runs."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use cep_sim::TelemetryRecord;

use crate::sink::TelemetrySink;
use crate::{PersistenceError, Result};

/// Sink that keeps records in memory and counts session lifecycle calls.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<TelemetryRecord>,
    acquired: bool,
    acquisitions: usize,
    releases: usize,
    fail_after: Option<usize>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose appends fail once it holds `limit` records.
    pub fn failing_after(limit: usize) -> Self {
        Self {
            fail_after: Some(limit),
            ..Self::default()
        }
    }

    /// Records appended so far.
    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// Consume the sink and return its records.
    pub fn into_records(self) -> Vec<TelemetryRecord> {
        self.records
    }

    /// Whether a session currently holds the sink.
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Number of successful acquisitions.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }

    /// Number of releases of an acquired handle.
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl TelemetrySink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn acquire(&mut self) -> Result<()> {
        self.acquired = true;
        self.acquisitions += 1;
        Ok(())
    }

    fn append(&mut self, records: &[TelemetryRecord]) -> Result<usize> {
        if !self.acquired {
            return Err(PersistenceError::NotAcquired(self.name()));
        }
        for record in records {
            if self.fail_after.is_some_and(|limit| self.records.len() >= limit) {
                return Err(PersistenceError::WriteFailed(format!(
                    "memory sink capacity of {} records reached",
                    self.records.len()
                )));
            }
            self.records.push(record.clone());
        }
        Ok(records.len())
    }

    fn release(&mut self) -> Result<()> {
        if self.acquired {
            self.acquired = false;
            self.releases += 1;
        }
        Ok(())
    }
}
