mod config;
mod error;
mod format;
mod log;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global subscriber described by `cfg`. Fails if one is already set.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::install_text(cfg),
        LoggerFormat::Json => log::install_json(cfg),
        LoggerFormat::Journald => log::install_journald(cfg),
    }
}
