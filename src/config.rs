//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - fuzzkit.toml (default configuration)
//! - fuzzkit.local.toml (git-ignored local overrides)
//! - Environment variables (FUZZKIT_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # fuzzkit.toml
//! [grid]
//! x_count = 201
//! y_count = 101
//!
//! [registry]
//! max_sessions_per_model = 0
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! FUZZKIT_GRID__X_COUNT=401
//! FUZZKIT_LOGGING__LEVEL=debug
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::grid::GridSpec;
use crate::registry::RegistryConfig;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sampling resolutions applied to newly created models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Samples across a variable's domain, endpoints included
    #[serde(default = "default_x_count")]
    pub x_count: usize,

    /// Gradations of the membership degree range, endpoints included
    #[serde(default = "default_y_count")]
    pub y_count: usize,
}

fn default_x_count() -> usize {
    GridSpec::DEFAULT_X_COUNT
}

fn default_y_count() -> usize {
    GridSpec::DEFAULT_Y_COUNT
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            x_count: default_x_count(),
            y_count: default_y_count(),
        }
    }
}

/// Registry limits
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrySection {
    /// Maximum sessions per model (0 = unlimited)
    #[serde(default)]
    pub max_sessions_per_model: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the standard layering: `fuzzkit.toml`, then
    /// `fuzzkit.local.toml`, then `FUZZKIT_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("fuzzkit.toml"))
            .merge(Toml::file("fuzzkit.local.toml"))
            .merge(Env::prefixed("FUZZKIT_").split("__"))
            .extract()
    }

    /// The grid resolutions as a [`GridSpec`] (degenerate values floored).
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec::new(self.grid.x_count, self.grid.y_count)
    }

    /// The registry configuration derived from this config.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            grid: self.grid_spec(),
            max_sessions_per_model: self.registry.max_sessions_per_model,
        }
    }
}
