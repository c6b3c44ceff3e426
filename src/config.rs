//! Process configuration, in the style of a defaults-with-override config
//! struct, adapted from a builder to a `from_env` constructor since this
//! service has no interactive caller to build options fluently —
//! everything comes from the process environment.

use std::fmt;

/// Default target the orchestrator and browser client talk to.
const DEFAULT_CDP_HOST: &str = "http://127.0.0.1:9222";
const DEFAULT_PDF_CONCURRENCY: usize = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    pub cdp_host: String,
    pub pdf_concurrency: usize,
    pub server_log_level: String,
    pub pdf_log_level: String,
    pub cdp_log_level: String,
}

#[derive(Debug)]
pub struct ConfigError {
    var: &'static str,
    value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Reads `CDP_HOST`, `PDF_CONCURRENCY`, `SERVER_LOG_LEVEL`,
    /// `PDF_LOG_LEVEL`, `CDP_LOG_LEVEL` from the environment, falling back
    /// to documented defaults. A non-numeric `PDF_CONCURRENCY` is a startup
    /// error rather than a silent fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cdp_host = std::env::var("CDP_HOST").unwrap_or_else(|_| DEFAULT_CDP_HOST.to_string());

        let pdf_concurrency = match std::env::var("PDF_CONCURRENCY") {
            Ok(raw) => raw.parse::<usize>().map_err(|_| ConfigError {
                var: "PDF_CONCURRENCY",
                value: raw,
            })?,
            Err(_) => DEFAULT_PDF_CONCURRENCY,
        };

        let log_level = |var: &str| {
            std::env::var(var).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
        };

        Ok(Self {
            cdp_host,
            pdf_concurrency,
            server_log_level: log_level("SERVER_LOG_LEVEL"),
            pdf_log_level: log_level("PDF_LOG_LEVEL"),
            cdp_log_level: log_level("CDP_LOG_LEVEL"),
        })
    }
}
</content>
