//! Strata configuration module.
//!
//! Provides configuration file support via `strata.toml`, environment
//! variables, and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (building a [`StrataConfig`] by hand)
//! 2. Environment variables (`STRATA_*`)
//! 3. Configuration file (`strata.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration sources.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },

    /// Failed to serialize configuration to TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),
}

/// Store configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Rows to reserve up front when building a container from this
    /// configuration (0 = allocate lazily on first insert).
    pub initial_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { initial_rows: 0 }
    }
}

/// Limits configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum rows a hash index built from this configuration accepts.
    /// Clamped to the structural limit of `u32::MAX - 2`.
    pub max_rows: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rows: (u32::MAX - 2) as usize,
        }
    }
}

/// Main Strata configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StrataConfig {
    /// Store configuration.
    pub store: StoreConfig,
    /// Limits configuration.
    pub limits: LimitsConfig,
}

impl StrataConfig {
    /// Loads configuration from default sources (`strata.toml` next to the
    /// working directory).
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("strata.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("STRATA_").split("_").lowercase(false));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Renders the configuration as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const STRUCTURAL_MAX: usize = (u32::MAX - 2) as usize;

        if self.limits.max_rows == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limits.max_rows".to_string(),
                message: "value must be at least 1".to_string(),
            });
        }
        if self.limits.max_rows > STRUCTURAL_MAX {
            return Err(ConfigError::InvalidValue {
                key: "limits.max_rows".to_string(),
                message: format!("value {} exceeds the structural limit {STRUCTURAL_MAX}",
                    self.limits.max_rows),
            });
        }
        if self.store.initial_rows > self.limits.max_rows {
            return Err(ConfigError::InvalidValue {
                key: "store.initial_rows".to_string(),
                message: format!(
                    "value {} exceeds limits.max_rows ({})",
                    self.store.initial_rows, self.limits.max_rows
                ),
            });
        }
        Ok(())
    }
}
