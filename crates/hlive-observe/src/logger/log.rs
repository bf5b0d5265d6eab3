use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError};

/// Human-readable lines on stderr. Stdout is reserved for container output.
pub(crate) fn install_text(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let lines = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg.use_color)
        .with_target(cfg.with_targets)
        .with_timer(local_rfc3339());
    install(tracing_subscriber::registry().with(filter_from(&cfg.level)?).with(lines))
}

/// One JSON object per line on stderr.
pub(crate) fn install_json(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let lines = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_timer(local_rfc3339());
    install(tracing_subscriber::registry().with(filter_from(&cfg.level)?).with(lines))
}

pub(crate) fn install_journald(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    journald(filter_from(&cfg.level)?)
}

pub(crate) fn filter_from(directives: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directives).map_err(|_| LoggerError::InvalidFilter(directives.to_string()))
}

// Falls back to UTC when the local offset cannot be read safely.
fn local_rfc3339() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn install<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber.try_init().map_err(|e| {
        let msg = e.to_string();
        if msg.contains("SetGlobalDefaultError") || msg.contains("global default") {
            LoggerError::AlreadyInstalled
        } else {
            LoggerError::Install(msg)
        }
    })
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(filter: EnvFilter) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::Install(format!("journald: {e}")))?;
    install(tracing_subscriber::registry().with(filter).with(layer))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_filter: EnvFilter) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldUnavailable)
}
