//! ---
//! cep_section: "03-persistence-logging"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Sink contract and scoped write sessions."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use cep_sim::TelemetryRecord;
use tracing::{debug, warn};

use crate::Result;

/// Append-only destination for telemetry records.
///
/// Writes happen between [`acquire`](TelemetrySink::acquire) and
/// [`release`](TelemetrySink::release). Callers normally go through
/// [`SinkSession`] or [`write_batch`] rather than calling these directly.
pub trait TelemetrySink {
    /// Short label used in logs and errors.
    fn name(&self) -> &'static str;

    /// Open the underlying handle.
    fn acquire(&mut self) -> Result<()>;

    /// Append `records` in the given order, returning how many were written.
    fn append(&mut self, records: &[TelemetryRecord]) -> Result<usize>;

    /// Flush and drop the handle. A no-op when nothing is acquired.
    fn release(&mut self) -> Result<()>;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn acquire(&mut self) -> Result<()> {
        (**self).acquire()
    }

    fn append(&mut self, records: &[TelemetryRecord]) -> Result<usize> {
        (**self).append(records)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

/// Acquired sink handle that is released when the session ends, including
/// when an append fails or the caller returns early.
pub struct SinkSession<'a, S: TelemetrySink + ?Sized> {
    sink: &'a mut S,
    released: bool,
}

impl<'a, S: TelemetrySink + ?Sized> SinkSession<'a, S> {
    /// Acquire `sink` for the lifetime of the session.
    pub fn open(sink: &'a mut S) -> Result<Self> {
        sink.acquire()?;
        debug!(sink = sink.name(), "sink acquired");
        Ok(Self {
            sink,
            released: false,
        })
    }

    /// Append records through the acquired handle.
    pub fn append(&mut self, records: &[TelemetryRecord]) -> Result<usize> {
        self.sink.append(records)
    }

    /// Release the handle and surface any flush error.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        self.sink.release()?;
        debug!(sink = self.sink.name(), "sink released");
        Ok(())
    }
}

impl<S: TelemetrySink + ?Sized> Drop for SinkSession<'_, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.sink.release() {
            warn!(sink = self.sink.name(), error = %err, "failed to release sink after aborted write");
        }
    }
}

/// Write one batch inside its own session. Errors are returned unchanged and
/// never retried.
pub fn write_batch<S: TelemetrySink + ?Sized>(
    sink: &mut S,
    records: &[TelemetryRecord],
) -> Result<usize> {
    let mut session = SinkSession::open(sink)?;
    let written = session.append(records)?;
    session.close()?;
    Ok(written)
}
