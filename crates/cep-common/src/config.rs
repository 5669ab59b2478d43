//! ---
//! cep_section: "01-core-functionality"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Pipeline configuration loading and validation."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_file() -> bool {
    true
}

fn default_simulation_hours() -> u32 {
    500
}

fn default_vibe_base() -> f64 {
    1.2
}

fn default_temp_base() -> f64 {
    42.0
}

fn default_vibe_slope_coeff() -> f64 {
    0.004
}

fn default_temp_slope_coeff() -> f64 {
    0.006
}

fn default_vibe_noise_stdev() -> f64 {
    0.15
}

fn default_temp_noise_stdev() -> f64 {
    0.4
}

fn default_warning_vibe_threshold() -> f64 {
    3.0
}

fn default_warning_temp_threshold() -> f64 {
    75.0
}

fn default_danger_vibe_threshold() -> f64 {
    4.2
}

fn default_danger_temp_threshold() -> f64 {
    90.0
}

fn default_schedule_csv() -> PathBuf {
    PathBuf::from("data/capital-project-schedules-and-budgets.csv")
}

fn default_staging_csv() -> PathBuf {
    PathBuf::from("data/staging/raw_nyc_projects.csv")
}

fn default_asset_registry_csv() -> PathBuf {
    PathBuf::from("data/asset_intelligence/dim_assets.csv")
}

fn default_telemetry_output() -> PathBuf {
    PathBuf::from("data/asset_intelligence/fact_telemetry.csv")
}

/// Primary configuration object for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "CEP_CONFIG";

    /// Load configuration from disk, respecting the `CEP_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `CEP_CONFIG` path must exist. When none of the candidates
    /// exist the defaults are returned, since every option has one.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        info!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found, using defaults"
        );
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.simulation.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Filter directive used when neither `CEP_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write the daily rolling JSON log under `directory`.
    #[serde(default = "default_log_file")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level)
            .with_context(|| format!("invalid logging level directive {:?}", self.level))?;
        Ok(())
    }
}

/// Parameters of the wear simulation and the health threshold ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_simulation_hours")]
    pub simulation_hours: u32,
    #[serde(default = "default_vibe_base")]
    pub vibe_base: f64,
    #[serde(default = "default_temp_base")]
    pub temp_base: f64,
    #[serde(default = "default_vibe_slope_coeff")]
    pub vibe_slope_coeff: f64,
    #[serde(default = "default_temp_slope_coeff")]
    pub temp_slope_coeff: f64,
    #[serde(default = "default_vibe_noise_stdev")]
    pub vibe_noise_stdev: f64,
    #[serde(default = "default_temp_noise_stdev")]
    pub temp_noise_stdev: f64,
    #[serde(default = "default_warning_vibe_threshold")]
    pub warning_vibe_threshold: f64,
    #[serde(default = "default_warning_temp_threshold")]
    pub warning_temp_threshold: f64,
    #[serde(default = "default_danger_vibe_threshold")]
    pub danger_vibe_threshold: f64,
    #[serde(default = "default_danger_temp_threshold")]
    pub danger_temp_threshold: f64,
    /// Seed for the noise generator. Entropy-seeded when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Simulate assets on separate threads with per-asset random streams.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulation_hours: default_simulation_hours(),
            vibe_base: default_vibe_base(),
            temp_base: default_temp_base(),
            vibe_slope_coeff: default_vibe_slope_coeff(),
            temp_slope_coeff: default_temp_slope_coeff(),
            vibe_noise_stdev: default_vibe_noise_stdev(),
            temp_noise_stdev: default_temp_noise_stdev(),
            warning_vibe_threshold: default_warning_vibe_threshold(),
            warning_temp_threshold: default_warning_temp_threshold(),
            danger_vibe_threshold: default_danger_vibe_threshold(),
            danger_temp_threshold: default_danger_temp_threshold(),
            seed: None,
            parallel: false,
        }
    }
}

impl SimulationConfig {
    /// Reject parameter sets that would produce meaningless readings.
    pub fn validate(&self) -> Result<()> {
        if self.simulation_hours == 0 {
            return Err(anyhow!("simulation_hours must be greater than zero"));
        }
        let finite = [
            ("vibe_base", self.vibe_base),
            ("temp_base", self.temp_base),
            ("vibe_slope_coeff", self.vibe_slope_coeff),
            ("temp_slope_coeff", self.temp_slope_coeff),
            ("warning_vibe_threshold", self.warning_vibe_threshold),
            ("warning_temp_threshold", self.warning_temp_threshold),
            ("danger_vibe_threshold", self.danger_vibe_threshold),
            ("danger_temp_threshold", self.danger_temp_threshold),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(anyhow!("{} must be a finite number, got {}", name, value));
            }
        }
        for (name, value) in [
            ("vibe_noise_stdev", self.vibe_noise_stdev),
            ("temp_noise_stdev", self.temp_noise_stdev),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!(
                    "{} must be a finite non-negative number, got {}",
                    name,
                    value
                ));
            }
        }
        if self.danger_vibe_threshold < self.warning_vibe_threshold {
            return Err(anyhow!(
                "danger_vibe_threshold ({}) is below warning_vibe_threshold ({})",
                self.danger_vibe_threshold,
                self.warning_vibe_threshold
            ));
        }
        if self.danger_temp_threshold < self.warning_temp_threshold {
            return Err(anyhow!(
                "danger_temp_threshold ({}) is below warning_temp_threshold ({})",
                self.danger_temp_threshold,
                self.warning_temp_threshold
            ));
        }
        Ok(())
    }
}

/// File locations standing in for the staging and asset-intelligence tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_schedule_csv")]
    pub schedule_csv: PathBuf,
    #[serde(default = "default_staging_csv")]
    pub staging_csv: PathBuf,
    #[serde(default = "default_asset_registry_csv")]
    pub asset_registry_csv: PathBuf,
    #[serde(default = "default_telemetry_output")]
    pub telemetry_output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            schedule_csv: default_schedule_csv(),
            staging_csv: default_staging_csv(),
            asset_registry_csv: default_asset_registry_csv(),
            telemetry_output: default_telemetry_output(),
        }
    }
}
