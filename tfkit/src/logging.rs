//! Logging setup for providers
//!
//! Terraform reads the plugin handshake from stdout, so all log output goes
//! to stderr. The level follows Terraform's own variables: `TF_LOG_PROVIDER`
//! wins over `TF_LOG`.

use crate::error::{Result, TfkitError};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

pub const TF_LOG: &str = "TF_LOG";
pub const TF_LOG_PROVIDER: &str = "TF_LOG_PROVIDER";

/// Log levels as Terraform names them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Picks the level from the provider override and the global setting.
    /// Unset or unrecognised values fall through; the default is `Info`.
    pub fn resolve(tf_log: Option<&str>, tf_log_provider: Option<&str>) -> Self {
        tf_log_provider
            .and_then(|v| v.parse().ok())
            .or_else(|| tf_log.and_then(|v| v.parse().ok()))
            .unwrap_or(LogLevel::Info)
    }

    pub fn from_env() -> Self {
        let tf_log = std::env::var(TF_LOG).ok();
        let tf_log_provider = std::env::var(TF_LOG_PROVIDER).ok();
        Self::resolve(tf_log.as_deref(), tf_log_provider.as_deref())
    }
}

impl FromStr for LogLevel {
    type Err = TfkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            // JSON is Terraform's trace-level structured output
            "TRACE" | "JSON" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(TfkitError::InvalidConfiguration(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filter().to_ascii_uppercase())
    }
}

/// Installs the global subscriber writing to stderr.
///
/// Fails if a subscriber is already installed; callers that may run more
/// than once (tests) can ignore that error.
pub fn init(level: LogLevel) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.as_filter()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| TfkitError::Logging(e.to_string()))
}

/// Installs the subscriber at the level taken from the environment
pub fn init_from_env() -> Result<()> {
    init(LogLevel::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_override_wins() {
        assert_eq!(
            LogLevel::resolve(Some("ERROR"), Some("debug")),
            LogLevel::Debug
        );
    }

    #[test]
    fn falls_back_to_tf_log_then_info() {
        assert_eq!(LogLevel::resolve(Some("warn"), None), LogLevel::Warn);
        assert_eq!(
            LogLevel::resolve(Some("warn"), Some("bogus")),
            LogLevel::Warn
        );
        assert_eq!(LogLevel::resolve(None, None), LogLevel::Info);
    }

    #[test]
    fn json_means_trace() {
        assert_eq!("JSON".parse::<LogLevel>().unwrap(), LogLevel::Trace);
    }

    #[test]
    fn second_init_is_reported_not_panicking() {
        let _ = init(LogLevel::Info);
        assert!(init(LogLevel::Debug).is_err());
    }
}
