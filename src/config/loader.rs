//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (ROUTEGUARD_*)
//! 2. Configuration file (TOML)
//! 3. Default values

use config::{Config, Environment, File, FileFormat};
use std::path::Path;

use crate::config::types::AppConfig;
use crate::error::ConfigError;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "routeguard.toml",
    ".routeguard.toml",
    "~/.config/routeguard/config.toml",
    "/etc/routeguard/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with ROUTEGUARD_ prefix
    // e.g., ROUTEGUARD_REGISTRY__URL, ROUTEGUARD_ADMIN__PORT
    // Double underscore (__) maps to nested keys (registry.url)
    builder = builder.add_source(
        Environment::with_prefix("ROUTEGUARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. Common conventions for the registry token and broker URL
    if let Ok(token) = std::env::var("REGISTRY_TOKEN") {
        builder = builder
            .set_override("registry.token", token)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    if let Ok(url) = std::env::var("REDIS_URL") {
        builder = builder
            .set_override("broker.url", url)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    // Build and deserialize
    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.registry.url.is_empty() {
        return Err(ConfigError::Missing {
            field: "registry.url".to_string(),
        });
    }

    if !config.registry.url.starts_with("http://") && !config.registry.url.starts_with("https://")
    {
        return Err(ConfigError::Invalid {
            message: format!(
                "registry.url must start with http:// or https://, got: {}",
                config.registry.url
            ),
        });
    }

    if config.registry.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "registry.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.broker.channel.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "broker.channel".to_string(),
        });
    }

    if config.refresh.health_check_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "refresh.health_check_secs must be greater than 0".to_string(),
        });
    }

    if config.refresh.event_dedup_ttl_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "refresh.event_dedup_ttl_secs must be greater than 0".to_string(),
        });
    }

    if config.admin.enabled && config.admin.port == 0 {
        return Err(ConfigError::Invalid {
            message: "admin.port must be greater than 0".to_string(),
        });
    }

    // Override rule texts are deliberately not validated here: rule parsing
    // is best-effort and unparsable entries are skipped at merge time.

    Ok(())
}
