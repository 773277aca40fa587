//! Logging configuration using tracing
//!
//! Everything goes to a daily rolling file inside the data directory, next to
//! `config.toml` and the tracking preference. Stdout carries the headless
//! NDJSON stream, so no layer ever writes there.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::error::Result;

/// Environment variable controlling the log filter
pub const LOG_ENV_VAR: &str = "WHEREABOUTS_LOG";

const DEFAULT_FILTER: &str = "whereabouts=info,whereabouts_app=info,whereabouts_core=info,warn";

const LOG_FILE_PREFIX: &str = "whereabouts.log";

/// Initialize the logging subsystem
///
/// Logs are written to `<data_dir>/logs/`. The level is controlled by the
/// `WHEREABOUTS_LOG` environment variable; an unparsable value falls back to
/// the default filter and is reported in the log itself.
///
/// # Examples
/// ```bash
/// WHEREABOUTS_LOG=debug whereabouts --data-dir /tmp/wa
/// WHEREABOUTS_LOG=whereabouts_app=trace whereabouts
/// ```
pub fn init(data_dir: &Path) -> Result<()> {
    let log_dir = log_directory(data_dir);
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (env_filter, rejected) = resolve_filter(std::env::var(LOG_ENV_VAR).ok().as_deref());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer(appender))
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("Whereabouts starting");
    tracing::info!("Log file: {}", current_log_file(data_dir).display());
    tracing::info!("═══════════════════════════════════════════════════════");

    if let Some(raw) = rejected {
        tracing::warn!(
            "Ignoring invalid {}={:?}, using \"{}\"",
            LOG_ENV_VAR,
            raw,
            DEFAULT_FILTER
        );
    }

    Ok(())
}

/// Directory holding the rolling log files for `data_dir`
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// The file today's records go to. Daily rotation names files by UTC date.
pub fn current_log_file(data_dir: &Path) -> PathBuf {
    log_directory(data_dir).join(format!(
        "{}.{}",
        LOG_FILE_PREFIX,
        Utc::now().format("%Y-%m-%d")
    ))
}

/// Pick the filter for an optional `WHEREABOUTS_LOG` value. Returns the raw
/// value as well when it was rejected.
fn resolve_filter(value: Option<&str>) -> (EnvFilter, Option<String>) {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => (EnvFilter::new(DEFAULT_FILTER), None),
        Some(raw) => match EnvFilter::try_new(raw) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new(DEFAULT_FILTER), Some(raw.to_string())),
        },
    }
}

/// Plain-text layer for a file writer
fn file_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
}
