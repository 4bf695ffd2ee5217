//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::query::DeploymentVariant;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query translation and assembly configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Which telemetry package statements target
    #[serde(default)]
    pub deployment: DeploymentVariant,

    /// Step used when a request has none (seconds)
    #[serde(default = "default_step_secs")]
    pub default_step_secs: i64,

    /// Row prefetch hint used when a SQL request has none
    #[serde(default = "default_prefetch_rows")]
    pub default_prefetch_rows: usize,

    /// Upper bound on samples per PromQL range
    #[serde(default = "default_max_data_points")]
    pub max_data_points: i64,

    /// Window for label listings without an explicit range (seconds)
    #[serde(default = "default_label_lookback")]
    pub label_lookback_secs: i64,
}

fn default_step_secs() -> i64 {
    10
}

fn default_prefetch_rows() -> usize {
    100
}

fn default_max_data_points() -> i64 {
    crate::query::MAX_DATA_POINTS
}

fn default_label_lookback() -> i64 {
    60 * 60 // 1 hour
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deployment: DeploymentVariant::default(),
            default_step_secs: default_step_secs(),
            default_prefetch_rows: default_prefetch_rows(),
            max_data_points: default_max_data_points(),
            label_lookback_secs: default_label_lookback(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("telemetry-frames").join("config.toml")),
            Some(PathBuf::from("/etc/telemetry-frames/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Engine overrides
        if let Some(name) = var("TFRAMES_DEPLOYMENT") {
            match DeploymentVariant::from_name(&name) {
                Some(deployment) => self.engine.deployment = deployment,
                None => tracing::warn!("Ignoring unknown TFRAMES_DEPLOYMENT {:?}", name),
            }
        }
        if let Some(step) = var("TFRAMES_DEFAULT_STEP") {
            match step.parse::<i64>() {
                Ok(s) if s > 0 => self.engine.default_step_secs = s,
                _ => tracing::warn!("Ignoring invalid TFRAMES_DEFAULT_STEP {:?}", step),
            }
        }
        if let Some(rows) = var("TFRAMES_PREFETCH_ROWS") {
            match rows.parse::<usize>() {
                Ok(r) if r > 0 => self.engine.default_prefetch_rows = r,
                _ => tracing::warn!("Ignoring invalid TFRAMES_PREFETCH_ROWS {:?}", rows),
            }
        }

        // Logging overrides
        if let Some(level) = var("TFRAMES_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TFRAMES_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# telemetry-frames configuration
#
# Environment variables override these settings:
# - TFRAMES_DEPLOYMENT
# - TFRAMES_DEFAULT_STEP
# - TFRAMES_PREFETCH_ROWS
# - TFRAMES_LOG_LEVEL
# - TFRAMES_LOG_FORMAT

[engine]
# Telemetry package deployment: standard or autonomous
deployment = "standard"

# Step used when a query has none (seconds)
default_step_secs = 10

# Row prefetch hint for SQL queries
default_prefetch_rows = 100

# Maximum samples per PromQL range; denser steps are widened
max_data_points = 720

# Label listings without a time range look back this far (seconds)
label_lookback_secs = 3600

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
