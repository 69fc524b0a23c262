//! # Unified Library Configuration
//!
//! This module provides a centralized configuration system for the deskew
//! host and logging. It supports loading from environment variables,
//! validation, and provides a clean interface for accessing configuration
//! throughout the library.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Execution-host configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Ceiling on vision-runtime initialization in seconds
    pub init_timeout_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            init_timeout_secs: 60,
        }
    }
}

impl HostConfig {
    /// Validate host configuration
    pub fn validate(&self) -> Result<()> {
        if self.init_timeout_secs == 0 {
            bail!("Init timeout cannot be 0");
        }

        if self.init_timeout_secs > 600 {
            bail!("Init timeout cannot be greater than 600 seconds");
        }

        Ok(())
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level for the library's own events (trace/debug/info/warn/error)
    pub log_level: String,
    /// Deployment environment; development switches to pretty formatting
    pub environment: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            environment: "production".to_string(),
        }
    }
}

impl LogConfig {
    /// Whether the environment selects developer-friendly output
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Validate logging configuration
    pub fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            bail!(
                "Log level '{}' is invalid. Expected one of: {}",
                self.log_level,
                LEVELS.join(", ")
            );
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Execution-host configuration
    pub host: HostConfig,
    /// Logging configuration
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.host.init_timeout_secs = env::var("DESKEW_INIT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| {
                anyhow::anyhow!("DESKEW_INIT_TIMEOUT_SECS must be a valid number")
            })?;

        config.logging.log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        config.logging.environment =
            env::var("ENVIRONMENT").unwrap_or_else(|_| "production".to_string());

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<()> {
        self.host.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: init_timeout_secs={}, log_level={}, environment={}",
            self.host.init_timeout_secs, self.logging.log_level, self.logging.environment
        )
    }
}
