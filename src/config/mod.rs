//! Engine configuration
//!
//! Loaded from a JSON file; every field has a default so `{}` is a valid
//! configuration.
//!
//! ```json
//! {
//!   "period_name": "system_time",
//!   "plan_cache": {"enabled": true, "max_entries": 64},
//!   "log_level": "warn"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Longest identifier the catalog accepts
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// History insert-plan cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCacheConfig {
    /// Reuse prepared history inserts across trigger invocations
    #[serde(default = "default_plan_cache_enabled")]
    pub enabled: bool,

    /// Maximum number of history tables with a cached plan
    #[serde(default = "default_plan_cache_max_entries")]
    pub max_entries: usize,
}

fn default_plan_cache_enabled() -> bool {
    true
}

fn default_plan_cache_max_entries() -> usize {
    64
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_plan_cache_enabled(),
            max_entries: default_plan_cache_max_entries(),
        }
    }
}

impl PlanCacheConfig {
    /// Every archive prepares a fresh statement
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_entries: 0,
        }
    }
}

/// Versioning engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Name of the system-time period looked up in the catalog
    #[serde(default = "default_period_name")]
    pub period_name: String,

    #[serde(default)]
    pub plan_cache: PlanCacheConfig,

    /// Lowest severity written by the logger
    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_period_name() -> String {
    "system_time".to_string()
}

fn default_log_level() -> Severity {
    Severity::Warn
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            period_name: default_period_name(),
            plan_cache: PlanCacheConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl VersioningConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: VersioningConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.period_name.is_empty() {
            return Err(ConfigError::Invalid("period_name must not be empty".into()));
        }
        if self.period_name.len() > MAX_IDENTIFIER_LEN {
            return Err(ConfigError::Invalid(format!(
                "period_name must be at most {} bytes",
                MAX_IDENTIFIER_LEN
            )));
        }
        if self.plan_cache.enabled && self.plan_cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "plan_cache.max_entries must be > 0 when the cache is enabled".into(),
            ));
        }
        Ok(())
    }
}
