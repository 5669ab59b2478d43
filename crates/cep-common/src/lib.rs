//! ---
//! cep_section: "01-core-functionality"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Shared primitives for the pipeline crates."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
//! Shared configuration and logging bootstrap for the CEP predictive
//! maintenance pipeline.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, PathsConfig, SimulationConfig};
pub use logging::{init_tracing, LogFormat};
