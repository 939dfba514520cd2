//! Daemon configuration
//!
//! One explicit struct built from the environment at startup. Core
//! components never read ambient state themselves; they receive plain values
//! from this struct through their constructors.

use std::time::Duration;

use thiserror::Error;

use crate::triggers::Endpoint;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(String),

    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: String, reason: String },
}

/// All configuration the daemon needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_webhook_url: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub prefect_api_url: String,
    pub prefect_api_auth_token: String,
    /// Endpoints for the VPN trigger; empty disables it
    pub vpn_endpoints: Vec<Endpoint>,
    pub late_runs_tolerance: Duration,
    pub agent_staleness_tolerance: Duration,
    /// How often each executor polls
    pub check_interval: Duration,
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Required: `DISCORD_WEBHOOK_URL`, `TELEGRAM_TOKEN`, `TELEGRAM_CHAT_ID`,
    /// `PREFECT_API_URL`, `PREFECT_API_AUTH_TOKEN`. Optional:
    /// `VPN_ENDPOINTS` (comma-separated `host:port:label`),
    /// `LATE_RUNS_TOLERANCE_SECS`, `AGENT_STALENESS_TOLERANCE_SECS`,
    /// `CHECK_INTERVAL_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            discord_webhook_url: required("DISCORD_WEBHOOK_URL")?,
            telegram_token: required("TELEGRAM_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?,
            prefect_api_url: required("PREFECT_API_URL")?,
            prefect_api_auth_token: required("PREFECT_API_AUTH_TOKEN")?,
            vpn_endpoints: parse_endpoints(
                "VPN_ENDPOINTS",
                &std::env::var("VPN_ENDPOINTS").unwrap_or_default(),
            )?,
            late_runs_tolerance: duration_secs("LATE_RUNS_TOLERANCE_SECS", 300)?,
            agent_staleness_tolerance: duration_secs("AGENT_STALENESS_TOLERANCE_SECS", 300)?,
            check_interval: duration_secs("CHECK_INTERVAL_SECS", 60)?,
        })
    }
}

fn required(var: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::Missing(var.to_string()))
}

fn duration_secs(var: &str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Parse a comma-separated list of `host:port:label` triples.
fn parse_endpoints(var: &str, raw: &str) -> Result<Vec<Endpoint>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = |reason: &str| ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("{:?}: {}", entry, reason),
            };
            let parts: Vec<&str> = entry.split(':').collect();
            let &[host, port, label] = parts.as_slice() else {
                return Err(invalid("expected host:port:label"));
            };
            let port: u16 = port.parse().map_err(|_| invalid("port is not a number"))?;
            Ok(Endpoint {
                host: host.to_string(),
                port,
                label: label.to_string(),
            })
        })
        .collect()
}
