//! Handler settings read from the Lambda environment

use std::time::Duration;

use thiserror::Error;

use crate::wait::WaitPolicy;

/// Environment variable selecting log verbosity
pub const LOGGING_LEVEL_VAR: &str = "logging_level";
pub const WAIT_TIMEOUT_VAR: &str = "ATTACHMENT_WAIT_TIMEOUT_SECS";
pub const POLL_INTERVAL_VAR: &str = "WAIT_POLL_INTERVAL_SECS";
pub const SERVICE_LINKED_ROLE_VAR: &str = "ENSURE_SERVICE_LINKED_ROLE";

const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Errors raised while reading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidDuration { name: &'static str, value: String },

    #[error("{name} must be true or false, got '{value}'")]
    InvalidBool { name: &'static str, value: String },
}

/// Log verbosity accepted by the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Info => log::LevelFilter::Info,
            Self::Warning => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

/// Something worth logging about the configuration itself
///
/// Settings are read before the logger exists, so diagnostics are collected
/// and emitted once logging is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNotice {
    LevelNotSet,
    LevelUnrecognized(String),
}

impl ConfigNotice {
    /// Write this notice to the log
    pub fn emit(&self) {
        match self {
            Self::LevelNotSet => {
                log::warn!("The {} environment variable is not set.", LOGGING_LEVEL_VAR);
                log::warn!("Setting the log level to ERROR");
            }
            Self::LevelUnrecognized(value) => {
                log::error!(
                    "The {} environment variable is set to '{}', not INFO, WARNING, or ERROR. \
                     The log level is set to ERROR",
                    LOGGING_LEVEL_VAR,
                    value
                );
            }
        }
    }
}

/// Settings for one handler process
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_level: LogLevel,
    pub wait: WaitPolicy,
    pub ensure_service_linked_role: bool,
    pub notices: Vec<ConfigNotice>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Error,
            wait: WaitPolicy::new(
                Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
                Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
            ),
            ensure_service_linked_role: false,
            notices: Vec::new(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        match lookup(LOGGING_LEVEL_VAR) {
            Some(value) => match LogLevel::parse(value.trim()) {
                Some(level) => settings.log_level = level,
                None => settings
                    .notices
                    .push(ConfigNotice::LevelUnrecognized(value)),
            },
            None => settings.notices.push(ConfigNotice::LevelNotSet),
        }

        let timeout = parse_secs(WAIT_TIMEOUT_VAR, lookup(WAIT_TIMEOUT_VAR))?;
        let interval = parse_secs(POLL_INTERVAL_VAR, lookup(POLL_INTERVAL_VAR))?;
        if let Some(timeout) = timeout {
            settings.wait.timeout = timeout;
        }
        if let Some(interval) = interval {
            settings.wait.interval = interval;
        }

        if let Some(value) = lookup(SERVICE_LINKED_ROLE_VAR) {
            settings.ensure_service_linked_role = match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidBool {
                        name: SERVICE_LINKED_ROLE_VAR,
                        value,
                    });
                }
            };
        }

        Ok(settings)
    }
}

fn parse_secs(name: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::InvalidDuration { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_level_defaults_to_error_when_unset() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.log_level, LogLevel::Error);
        assert_eq!(settings.notices, vec![ConfigNotice::LevelNotSet]);
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let settings = settings_from(&[("logging_level", "info")]).unwrap();
        assert_eq!(settings.log_level, LogLevel::Info);
        assert!(settings.notices.is_empty());

        let settings = settings_from(&[("logging_level", "WARNING")]).unwrap();
        assert_eq!(settings.log_level, LogLevel::Warning);
    }

    #[test]
    fn test_unknown_level_falls_back_to_error() {
        let settings = settings_from(&[("logging_level", "DEBUG")]).unwrap();
        assert_eq!(settings.log_level, LogLevel::Error);
        assert_eq!(
            settings.notices,
            vec![ConfigNotice::LevelUnrecognized("DEBUG".to_string())]
        );
    }

    #[test]
    fn test_level_filter_mapping() {
        assert_eq!(LogLevel::Info.to_level_filter(), log::LevelFilter::Info);
        assert_eq!(LogLevel::Warning.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    }

    #[test]
    fn test_wait_overrides() {
        let settings = settings_from(&[
            ("ATTACHMENT_WAIT_TIMEOUT_SECS", "120"),
            ("WAIT_POLL_INTERVAL_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(settings.wait.timeout, Duration::from_secs(120));
        assert_eq!(settings.wait.interval, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let err = settings_from(&[("WAIT_POLL_INTERVAL_SECS", "0")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "WAIT_POLL_INTERVAL_SECS must be a positive number of seconds, got '0'"
        );
        assert!(settings_from(&[("ATTACHMENT_WAIT_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn test_service_linked_role_flag() {
        assert!(!settings_from(&[]).unwrap().ensure_service_linked_role);
        assert!(
            settings_from(&[("ENSURE_SERVICE_LINKED_ROLE", "True")])
                .unwrap()
                .ensure_service_linked_role
        );
        assert!(settings_from(&[("ENSURE_SERVICE_LINKED_ROLE", "maybe")]).is_err());
    }
}
