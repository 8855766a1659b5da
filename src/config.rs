//! Runner and target configuration
//!
//! Everything is read from the process environment (a `.env` file is loaded by
//! the binary first). Command line flags override a handful of runner knobs.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://kablamo.bank.api";
pub const DEFAULT_UI_URL: &str = "https://kablamo.bank";
pub const DEFAULT_API_TOKEN: &str = "ey.123";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";
pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REPORT_DIR: &str = "e2e-report";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be true or false, got {value:?}")]
    InvalidBool { var: &'static str, value: String },
    #[error("unknown reporter {0:?} (expected html, list or json)")]
    UnknownReporter(String),
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Deployment the UI is served from, selects the expected layout marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Uat,
    Other(String),
    Unset,
}

impl Environment {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => Environment::Unset,
            Some("dev") => Environment::Dev,
            Some("uat") => Environment::Uat,
            Some(other) => Environment::Other(other.to_string()),
        }
    }

    /// `data-testid` of the table this environment renders, if it has one
    pub fn layout_marker(&self) -> Option<&'static str> {
        match self {
            Environment::Dev => Some("dev-table"),
            Environment::Uat => Some("uat-table"),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "dev"),
            Environment::Uat => write!(f, "uat"),
            Environment::Other(value) => write!(f, "{}", value),
            Environment::Unset => write!(f, "<unset>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterKind {
    Html,
    List,
    Json,
}

impl FromStr for ReporterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(ReporterKind::Html),
            "list" => Ok(ReporterKind::List),
            "json" => Ok(ReporterKind::Json),
            _ => Err(ConfigError::UnknownReporter(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub api_base_url: String,
    pub ui_base_url: String,
    pub api_token: String,
    pub environment: Environment,
    pub webdriver_url: String,
    pub fully_parallel: bool,
    pub workers: usize,
    pub timeout: Duration,
    pub action_timeout: Duration,
    pub reporter: ReporterKind,
    pub report_dir: PathBuf,
    /// Only tests whose full title contains this run
    pub grep: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            ui_base_url: DEFAULT_UI_URL.to_string(),
            api_token: DEFAULT_API_TOKEN.to_string(),
            environment: Environment::Unset,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            fully_parallel: true,
            workers: DEFAULT_WORKERS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            reporter: ReporterKind::Html,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            grep: None,
        }
    }
}

impl RunnerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup, so tests don't have to touch the real environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            api_base_url: lookup("KABLAMO_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            ui_base_url: lookup("KABLAMO_UI_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ui_base_url),
            api_token: lookup("KABLAMO_API_TOKEN").unwrap_or(defaults.api_token),
            environment: Environment::parse(lookup("ENVIRONMENT").as_deref()),
            webdriver_url: lookup("WEBDRIVER_URL").unwrap_or(defaults.webdriver_url),
            fully_parallel: match lookup("E2E_FULLY_PARALLEL") {
                Some(value) => parse_bool("E2E_FULLY_PARALLEL", &value)?,
                None => defaults.fully_parallel,
            },
            workers: match lookup("E2E_WORKERS") {
                Some(value) => parse_number("E2E_WORKERS", &value)?,
                None => defaults.workers,
            },
            timeout: match lookup("E2E_TIMEOUT_MS") {
                Some(value) => Duration::from_millis(parse_number("E2E_TIMEOUT_MS", &value)?),
                None => defaults.timeout,
            },
            action_timeout: match lookup("E2E_ACTION_TIMEOUT_MS") {
                Some(value) => {
                    Duration::from_millis(parse_number("E2E_ACTION_TIMEOUT_MS", &value)?)
                }
                None => defaults.action_timeout,
            },
            reporter: match lookup("E2E_REPORTER") {
                Some(value) => value.parse()?,
                None => defaults.reporter,
            },
            report_dir: lookup("E2E_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
            grep: None,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.api_base_url.is_empty() {
            return Err(ConfigError::Empty("KABLAMO_API_URL"));
        }
        if self.ui_base_url.is_empty() {
            return Err(ConfigError::Empty("KABLAMO_UI_URL"));
        }
        if self.api_token.is_empty() {
            return Err(ConfigError::Empty("KABLAMO_API_TOKEN"));
        }
        Ok(())
    }

    /// Number of tests allowed in flight at once
    pub fn effective_workers(&self) -> usize {
        if self.fully_parallel {
            self.workers.max(1)
        } else {
            1
        }
    }

    pub fn ui_url(&self, path: &str) -> String {
        format!("{}/{}", self.ui_base_url, path.trim_start_matches('/'))
    }
}

fn parse_number<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<RunnerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunnerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_suite_settings() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_base_url, "https://kablamo.bank.api");
        assert_eq!(config.workers, 3);
        assert!(config.fully_parallel);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.action_timeout, Duration::from_secs(5));
        assert_eq!(config.reporter, ReporterKind::Html);
        assert_eq!(config.environment, Environment::Unset);
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = load(&[
            ("KABLAMO_API_URL", "http://127.0.0.1:9000/"),
            ("ENVIRONMENT", "uat"),
            ("E2E_WORKERS", "8"),
            ("E2E_REPORTER", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.environment, Environment::Uat);
        assert_eq!(config.workers, 8);
        assert_eq!(config.reporter, ReporterKind::Json);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert_eq!(
            load(&[("E2E_WORKERS", "three")]).unwrap_err(),
            ConfigError::InvalidNumber {
                var: "E2E_WORKERS",
                value: "three".to_string()
            }
        );
        assert_eq!(load(&[("E2E_WORKERS", "0")]).unwrap_err(), ConfigError::NoWorkers);
        assert_eq!(
            load(&[("E2E_WORKERS", "99999999999999999999999")]).unwrap_err(),
            ConfigError::InvalidNumber {
                var: "E2E_WORKERS",
                value: "99999999999999999999999".to_string()
            }
        );
        assert!(matches!(
            load(&[("E2E_TIMEOUT_MS", "-1")]),
            Err(ConfigError::InvalidNumber { var: "E2E_TIMEOUT_MS", .. })
        ));
        assert!(matches!(
            load(&[("E2E_REPORTER", "junit")]),
            Err(ConfigError::UnknownReporter(_))
        ));
        assert!(matches!(
            load(&[("E2E_FULLY_PARALLEL", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_serial_mode_uses_one_worker() {
        let config = load(&[("E2E_FULLY_PARALLEL", "false")]).unwrap();
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_layout_marker_per_environment() {
        assert_eq!(Environment::parse(Some("dev")).layout_marker(), Some("dev-table"));
        assert_eq!(Environment::parse(Some("uat")).layout_marker(), Some("uat-table"));
        assert_eq!(Environment::parse(Some("prod")).layout_marker(), None);
        assert_eq!(Environment::parse(None).layout_marker(), None);
    }

    #[test]
    fn test_ui_url_joins_paths() {
        let config = RunnerConfig::default();
        assert_eq!(config.ui_url("/accounts"), "https://kablamo.bank/accounts");
        assert_eq!(config.ui_url("accounts"), "https://kablamo.bank/accounts");
    }
}
