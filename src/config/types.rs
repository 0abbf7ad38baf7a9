//! Configuration types for routeguard
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use serde::Deserialize;
use std::time::Duration;

use crate::policy::OverrideEntry;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Policy registry connection settings
    pub registry: RegistryConfig,

    /// Change-event broker settings
    pub broker: BrokerConfig,

    /// Refresh coordinator timing
    pub refresh: RefreshConfig,

    /// Admin/diagnostics server
    pub admin: AdminConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Static policy overrides ([[overrides]] tables); these win over
    /// registry policies for the same client id
    pub overrides: Vec<OverrideEntry>,
}

/// Policy registry connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry base URL (e.g. `https://registry.internal`)
    pub url: String,

    /// Bearer token (prefer env var REGISTRY_TOKEN)
    #[serde(default)]
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for failed requests
    pub max_retries: u32,

    /// Whether to verify SSL certificates
    pub verify_ssl: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8091".to_string(),
            token: None,
            timeout_secs: 10,
            max_retries: 3,
            verify_ssl: true,
        }
    }
}

impl RegistryConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> String {
        self.url.trim_end_matches('/').to_string()
    }
}

/// Change-event broker configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker URL (e.g. `redis://127.0.0.1:6379`)
    pub url: String,

    /// Pub/sub channel carrying policy change events
    pub channel: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            channel: "policy-changes".to_string(),
        }
    }
}

/// Refresh coordinator timing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Period of the broker health check (and of full reloads while polling)
    pub health_check_secs: u64,

    /// How long processed event ids are remembered for deduplication
    pub event_dedup_ttl_secs: u64,

    /// Period of the dedup table sweep
    pub dedup_sweep_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            health_check_secs: 5,
            event_dedup_ttl_secs: 60,
            dedup_sweep_secs: 30,
        }
    }
}

impl RefreshConfig {
    pub fn health_check_period(&self) -> Duration {
        Duration::from_secs(self.health_check_secs)
    }

    pub fn event_dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.event_dedup_ttl_secs)
    }

    pub fn dedup_sweep_period(&self) -> Duration {
        Duration::from_secs(self.dedup_sweep_secs)
    }
}

/// Admin server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin server
    pub enabled: bool,

    /// Admin host
    pub host: String,

    /// Admin port
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
