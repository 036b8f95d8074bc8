use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::constants::{api, connection};
use crate::error::ConfigError;

fn default_ws_url() -> String {
    connection::DEFAULT_WS_URL.to_string()
}

fn default_retry_interval_ms() -> u64 {
    connection::RETRY_INTERVAL.as_millis() as u64
}

fn default_event_bus_capacity() -> usize {
    connection::DEFAULT_EVENT_BUS_CAPACITY
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_addr() -> String {
    api::DEFAULT_ADDR.to_string()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    #[serde(default = "default_api_enabled")]
    pub api_enabled: bool,

    #[serde(default = "default_api_addr")]
    pub api_addr: String,

    /// Six-field cron expression, e.g. "*/30 * * * * *". Keep-alive is off when unset.
    #[serde(default)]
    pub keep_alive_cron: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            retry_interval_ms: default_retry_interval_ms(),
            event_bus_capacity: default_event_bus_capacity(),
            api_enabled: default_api_enabled(),
            api_addr: default_api_addr(),
            keep_alive_cron: None,
        }
    }
}

impl AppConfig {
    /// Load `config.yaml` (if present), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from("config.yaml")?;
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("ℹ️ {} not found - using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Environment wins over the file. `lookup` is injectable so tests don't touch process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MONITOR_WS_URL") {
            self.ws_url = url;
        }
        if let Some(ms) = lookup("MONITOR_RETRY_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.retry_interval_ms = ms;
        }
        if let Some(addr) = lookup("MONITOR_API_ADDR") {
            self.api_addr = addr;
        }
        if let Some(cron) = lookup("MONITOR_KEEP_ALIVE_CRON") {
            self.keep_alive_cron = if cron.trim().is_empty() { None } else { Some(cron) };
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ws_url(&self.ws_url).map_err(|reason| ConfigError::Invalid {
            field: "ws_url",
            reason,
        })?;

        if self.retry_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "retry_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.event_bus_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "event_bus_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Accepts only `ws://` and `wss://` endpoints.
pub fn validate_ws_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}
