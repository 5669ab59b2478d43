//! ---
//! cep_section: "01-core-functionality"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Tracing subscriber bootstrap for pipeline commands."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "CEP_LOG";
const FALLBACK_DIRECTIVE: &str = "info";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static CONSOLE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Console output formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Where the active filter directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterSource {
    CepLog,
    RustLog,
    Config,
    Fallback,
}

/// Pick the first directive that parses: `CEP_LOG`, `RUST_LOG`, then the
/// configured level. Rejected directives are reported on stderr.
fn resolve_filter(
    cep_log: Option<&str>,
    rust_log: Option<&str>,
    configured: &str,
) -> (EnvFilter, FilterSource) {
    let candidates = [
        (FilterSource::CepLog, LOG_ENV, cep_log),
        (FilterSource::RustLog, "RUST_LOG", rust_log),
        (FilterSource::Config, "logging.level", Some(configured)),
    ];
    for (source, origin, directive) in candidates {
        let Some(directive) = directive.filter(|d| !d.trim().is_empty()) else {
            continue;
        };
        match EnvFilter::try_new(directive) {
            Ok(filter) => return (filter, source),
            Err(err) => eprintln!("ignoring invalid {origin} directive {directive:?}: {err}"),
        }
    }
    (EnvFilter::new(FALLBACK_DIRECTIVE), FilterSource::Fallback)
}

/// Initialize the tracing subscriber for a pipeline command.
///
/// Console output goes to stderr in [`LoggingConfig::format`] so that command
/// output on stdout stays machine readable. When [`LoggingConfig::file`] is set a
/// daily rolling JSON file named after `file_prefix` (or `service_name`) is kept
/// in [`LoggingConfig::directory`].
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let cep_log = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var("RUST_LOG").ok();
    let (filter, filter_source) =
        resolve_filter(cep_log.as_deref(), rust_log.as_deref(), &config.level);

    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(console_guard);

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(console_writer)
            .boxed(),
    };

    let file_layer = if config.file {
        std::fs::create_dir_all(&config.directory)?;
        let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
        let (file_writer, file_guard) =
            tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
        let _ = FILE_GUARD.set(file_guard);
        Some(
            fmt::layer()
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(file_writer)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        filter_source = ?filter_source,
        log_file = config.file,
        log_dir = %config.directory.display(),
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}
