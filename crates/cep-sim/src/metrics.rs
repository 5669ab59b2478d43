//! ---
//! cep_section: "11-simulation"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Prometheus instrumentation for telemetry generation."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{self, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

use crate::errors::Result;
use crate::records::HealthStatus;

/// Metrics published while generating telemetry.
#[derive(Clone)]
pub struct SimulationMetrics {
    records_generated: IntCounterVec,
    assets_simulated: IntCounter,
    generation_duration: Histogram,
    registry: Arc<Registry>,
}

impl SimulationMetrics {
    /// Register all simulation metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let records_generated = IntCounterVec::new(
            Opts::new(
                "cep_telemetry_records_generated_total",
                "Telemetry records generated, by health status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(records_generated.clone()))?;

        let assets_simulated = IntCounter::new(
            "cep_assets_simulated_total",
            "Assets for which a full telemetry window was simulated",
        )?;
        registry.register(Box::new(assets_simulated.clone()))?;

        let generation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cep_telemetry_generation_duration_seconds",
                "Wall time spent generating one telemetry batch",
            )
            .buckets(prometheus::exponential_buckets(0.001, 2.0, 12)?),
        )?;
        registry.register(Box::new(generation_duration.clone()))?;

        Ok(Self {
            records_generated,
            assets_simulated,
            generation_duration,
            registry,
        })
    }

    pub fn record_status(&self, status: HealthStatus, count: u64) {
        self.records_generated
            .with_label_values(&[status.as_ref()])
            .inc_by(count);
    }

    pub fn record_assets(&self, count: u64) {
        self.assets_simulated.inc_by(count);
    }

    pub fn observe_generation(&self, seconds: f64) {
        self.generation_duration.observe(seconds);
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl std::fmt::Debug for SimulationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationMetrics").finish_non_exhaustive()
    }
}
