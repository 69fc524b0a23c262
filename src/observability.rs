//! Tracing and logging setup module.
//!
//! Provides structured logging configuration for applications embedding the
//! deskew pipeline: pretty formatting for development, JSON elsewhere.

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::config::LogConfig;

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &LogConfig) -> Result<()> {
    // Create the filter based on configuration
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("page_deskew={}", config.log_level).parse()?);

    // Initialize based on environment (pretty for development, JSON for others)
    if config.is_development()
        || std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty"
    {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init();
    } else {
        // JSON formatting for production (default)
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize structured logging with library defaults
pub fn init_tracing() -> Result<()> {
    init_tracing_with_config(&LogConfig::default())
}
