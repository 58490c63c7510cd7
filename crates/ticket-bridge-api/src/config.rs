//! Configuration types for the HTTP service
//!
//! Only non-secret settings live here. Credentials and connection strings are
//! resolved separately through the core crate's `SecretResolver`.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook processing settings
    pub webhooks: WebhookConfig,

    /// Parameter store lookup settings
    pub parameter_store: ParameterStoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check values that would only fail later at bind or request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "server.host".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be non-zero".to_string(),
            });
        }

        if self.server.shutdown_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.shutdown_timeout_seconds must be non-zero".to_string(),
            });
        }

        let path = &self.webhooks.endpoint_path;
        if path.is_empty() {
            return Err(ConfigError::Missing {
                key: "webhooks.endpoint_path".to_string(),
            });
        }
        if !path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!("webhooks.endpoint_path must start with '/', got '{}'", path),
            });
        }
        if path == "/" || path == "/ready" {
            return Err(ConfigError::Invalid {
                message: format!("webhooks.endpoint_path '{}' collides with a health route", path),
            });
        }

        if self.parameter_store.enabled && self.parameter_store.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "parameter_store.timeout_seconds must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            shutdown_timeout_seconds: 30,
            max_body_size: 25 * 1024 * 1024, // GitHub caps payloads at 25MB
        }
    }
}

/// Webhook processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Keep the rendered ticket description in each audit record
    pub store_payload_snapshot: bool,

    /// Include the failure message in 500 responses
    pub expose_error_details: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook".to_string(),
            store_payload_snapshot: true,
            expose_error_details: false,
        }
    }
}

/// AWS SSM Parameter Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterStoreConfig {
    /// Consult the parameter store before the environment
    pub enabled: bool,

    /// AWS region; the SDK's provider chain is used when unset
    pub region: Option<String>,

    /// Per-lookup timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ParameterStoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            region: None,
            timeout_seconds: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
