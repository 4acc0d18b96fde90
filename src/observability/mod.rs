//! Telemetry and tracing utilities
//!
//! The library itself only emits `tracing` events. Applications (and examples)
//! that want them printed can install a subscriber here.
//!
//! ## Example
//!
//! ```rust,ignore
//! use httpapi::observability::{init_subscriber, SubscriberConfig, OutputFormat};
//!
//! let config = SubscriberConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! init_subscriber(config)?;
//! ```

use tracing_subscriber::EnvFilter;

use crate::error::HttpApiError;

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Configuration for tracing subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Extra `EnvFilter` directives, e.g. `"httpapi::retry=trace"`.
    pub filter: Option<String>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            filter: None,
        }
    }
}

impl SubscriberConfig {
    /// Create a new builder for SubscriberConfig
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    /// Create a debug configuration
    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, HttpApiError> {
        let mut directives = self.log_level.to_string().to_lowercase();
        if let Some(extra) = &self.filter {
            directives.push(',');
            directives.push_str(extra);
        }
        EnvFilter::try_new(&directives).map_err(|e| {
            HttpApiError::InvalidConfiguration(format!("Invalid log filter '{directives}': {e}"))
        })
    }
}

/// Builder for SubscriberConfig
#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    filter: Option<String>,
}

impl SubscriberConfigBuilder {
    /// Set the log level
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the log level from a string
    pub fn log_level_str(mut self, level: &str) -> Result<Self, HttpApiError> {
        let level = level.parse::<tracing::Level>().map_err(|_| {
            HttpApiError::InvalidConfiguration(format!(
                "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
            ))
        })?;
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    pub fn build(self) -> SubscriberConfig {
        let defaults = SubscriberConfig::default();
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(defaults.log_level),
            output_format: self.output_format.unwrap_or(defaults.output_format),
            filter: self.filter,
        }
    }
}

/// Install a global tracing subscriber.
///
/// Fails if the filter is invalid or a global subscriber is already set.
pub fn init_subscriber(config: SubscriberConfig) -> Result<(), HttpApiError> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.output_format {
        OutputFormat::Text => builder.try_init(),
        OutputFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| HttpApiError::InternalError(format!("Failed to install subscriber: {e}")))
}
