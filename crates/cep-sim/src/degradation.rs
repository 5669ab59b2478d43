//! ---
//! cep_section: "11-simulation"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Linear wear trend with Gaussian sensor jitter."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use cep_common::SimulationConfig;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::errors::{Result, SimError};
use crate::records::{Reading, SensorChannel};

/// Baselines, wear slopes and noise levels of the degradation process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegradationParams {
    pub vibe_base: f64,
    pub temp_base: f64,
    pub vibe_slope_coeff: f64,
    pub temp_slope_coeff: f64,
    pub vibe_noise_stdev: f64,
    pub temp_noise_stdev: f64,
}

impl Default for DegradationParams {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

impl From<&SimulationConfig> for DegradationParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            vibe_base: config.vibe_base,
            temp_base: config.temp_base,
            vibe_slope_coeff: config.vibe_slope_coeff,
            temp_slope_coeff: config.temp_slope_coeff,
            vibe_noise_stdev: config.vibe_noise_stdev,
            temp_noise_stdev: config.temp_noise_stdev,
        }
    }
}

/// Memoryless wear model: `base + hour * slope + N(0, stdev)` per channel.
///
/// The model owns no random state. Callers pass the generator in, so a seeded
/// `StdRng` reproduces a run exactly.
#[derive(Debug, Clone)]
pub struct DegradationModel {
    params: DegradationParams,
    vibration_noise: Normal<f64>,
    temperature_noise: Normal<f64>,
}

impl DegradationModel {
    pub fn new(params: DegradationParams) -> Result<Self> {
        for (name, value) in [
            ("vibe_base", params.vibe_base),
            ("temp_base", params.temp_base),
            ("vibe_slope_coeff", params.vibe_slope_coeff),
            ("temp_slope_coeff", params.temp_slope_coeff),
        ] {
            if !value.is_finite() {
                return Err(SimError::InvalidParameter {
                    name,
                    reason: format!("expected a finite value, got {value}"),
                });
            }
        }
        // Normal::new only rejects non-finite deviations.
        for (name, value) in [
            ("vibe_noise_stdev", params.vibe_noise_stdev),
            ("temp_noise_stdev", params.temp_noise_stdev),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(SimError::InvalidParameter {
                    name,
                    reason: format!("expected a finite non-negative deviation, got {value}"),
                });
            }
        }
        Ok(Self {
            params,
            vibration_noise: Normal::new(0.0, params.vibe_noise_stdev)?,
            temperature_noise: Normal::new(0.0, params.temp_noise_stdev)?,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        Self::new(DegradationParams::from(config))
    }

    pub fn params(&self) -> &DegradationParams {
        &self.params
    }

    /// Noise-free trend value at `hour`.
    pub fn expected(&self, hour: u32) -> Reading {
        let hour = f64::from(hour);
        Reading::new(
            self.params.vibe_base + hour * self.params.vibe_slope_coeff,
            self.params.temp_base + hour * self.params.temp_slope_coeff,
        )
    }

    /// Draw one reading at `hour`: the trend plus an independent draw per channel.
    pub fn sample<R: Rng + ?Sized>(&self, hour: u32, rng: &mut R) -> Result<Reading> {
        let trend = self.expected(hour);
        let reading = Reading::new(
            trend.vibration + self.vibration_noise.sample(rng),
            trend.temperature + self.temperature_noise.sample(rng),
        );
        if !reading.vibration.is_finite() {
            return Err(SimError::NonFiniteReading {
                channel: SensorChannel::Vibration,
                hour,
            });
        }
        if !reading.temperature.is_finite() {
            return Err(SimError::NonFiniteReading {
                channel: SensorChannel::Temperature,
                hour,
            });
        }
        Ok(reading)
    }
}
