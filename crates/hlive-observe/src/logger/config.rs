use std::io::IsTerminal;

use crate::logger::format::LoggerFormat;

/// Logger settings resolved from the environment before the first log line.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `"info"` or `"hlive=debug,bollard=warn"`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl LoggerConfig {
    /// Build a config from raw `LOG_FORMAT` / `LOG_LEVEL` values.
    ///
    /// Missing values fall back to [`LoggerConfig::default`].
    pub fn from_parts(
        format: Option<&str>,
        level: Option<&str>,
    ) -> Result<Self, crate::LoggerError> {
        let mut cfg = Self::default();
        if let Some(format) = format {
            cfg.format = format.parse()?;
        }
        if let Some(level) = level.map(str::trim).filter(|l| !l.is_empty()) {
            cfg.level = level.to_string();
        }
        Ok(cfg)
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        // Container output shares stdout with our own log lines; logs go to stderr.
        let use_color = cfg!(test) || std::io::stderr().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}
