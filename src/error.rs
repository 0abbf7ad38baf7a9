//! Error types for routeguard
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors that are part of the API.
//! Malformed access rules are deliberately *not* an error type: rule parsing
//! is best-effort by contract and unparsable entries are skipped.

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Policy registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Policy registry errors (retrieval failures)
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Registry API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No policy found for client '{client_id}'")]
    NotFound { client_id: String },

    #[error("Unauthorized: invalid or expired registry token")]
    Unauthorized,

    #[error("Invalid response from registry: {0}")]
    InvalidResponse(String),
}

impl RegistryError {
    /// Create an appropriate error from an HTTP status code and response body
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => RegistryError::Unauthorized,
            _ => RegistryError::Api {
                status,
                message: if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.to_string()
                },
            },
        }
    }
}

/// Change-event broker errors
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Broker connection failed: {0}")]
    Connection(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Broker ping failed: {0}")]
    Ping(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
