use std::{fmt, str::FromStr};

use crate::logger::error::LoggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    Text,
    Json,
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "text" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            "journald" | "journal" => {
                #[cfg(all(target_os = "linux", feature = "journald"))]
                {
                    Ok(LoggerFormat::Journald)
                }

                #[cfg(not(all(target_os = "linux", feature = "journald")))]
                {
                    Err(LoggerError::JournaldUnavailable)
                }
            }
            _ => Err(LoggerError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_and_space_insensitive() {
        assert_eq!(" Text ".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
        assert_eq!("JSON".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
    }

    #[test]
    fn parse_unknown_keeps_original_input() {
        match "xml".parse::<LoggerFormat>() {
            Err(LoggerError::UnknownFormat(s)) => assert_eq!(s, "xml"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(not(all(target_os = "linux", feature = "journald")))]
    #[test]
    fn journald_without_feature_is_rejected() {
        assert!(matches!(
            "journald".parse::<LoggerFormat>(),
            Err(LoggerError::JournaldUnavailable)
        ));
    }
}
