//! ---
//! cep_section: "11-simulation"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Threshold ladder mapping readings to health levels."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use cep_common::SimulationConfig;

use crate::records::{HealthStatus, Reading};

/// One rung of the ladder: fires when either channel strictly exceeds its limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRule {
    pub status: HealthStatus,
    pub vibration_above: f64,
    pub temperature_above: f64,
}

impl ThresholdRule {
    pub fn new(status: HealthStatus, vibration_above: f64, temperature_above: f64) -> Self {
        Self {
            status,
            vibration_above,
            temperature_above,
        }
    }

    pub fn is_triggered(&self, reading: &Reading) -> bool {
        reading.vibration > self.vibration_above || reading.temperature > self.temperature_above
    }
}

/// Ordered rule table. Every rule is evaluated; a firing rule can raise the
/// status but never lower it.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthClassifier {
    rules: Vec<ThresholdRule>,
}

impl HealthClassifier {
    pub fn new(rules: Vec<ThresholdRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(vec![
            ThresholdRule::new(
                HealthStatus::Warning,
                config.warning_vibe_threshold,
                config.warning_temp_threshold,
            ),
            ThresholdRule::new(
                HealthStatus::Danger,
                config.danger_vibe_threshold,
                config.danger_temp_threshold,
            ),
        ])
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    pub fn classify(&self, reading: &Reading) -> HealthStatus {
        self.rules
            .iter()
            .filter(|rule| rule.is_triggered(reading))
            .fold(HealthStatus::Operational, |status, rule| {
                status.max(rule.status)
            })
    }
}

impl Default for HealthClassifier {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}
