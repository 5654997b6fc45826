//! Tool configuration.
//!
//! The defaults in `config/default.toml` are baked into the binary. A user
//! file replaces only the keys it sets.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wifi_map_classify::ClassifyConfig;
use wifi_map_district::DistrictConfig;
use wifi_map_speed::SpeedConfig;

/// Embedded default configuration.
const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// File that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML is malformed or has wrong types.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("Invalid config value for {key}: {reason}")]
    Invalid {
        /// Dotted key path.
        key: &'static str,
        /// What is wrong.
        reason: String,
    },
}

/// All settings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Clustering and ranking.
    pub classify: ClassifyConfig,
    /// Nearby AP ranking.
    pub speed: SpeedConfig,
    /// District statistics.
    pub district: DistrictConfig,
}

impl AppConfig {
    /// Parses a TOML document on top of the built-in defaults.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the TOML is malformed
    /// * [`ConfigError::Invalid`] if a value is out of range
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the embedded defaults, then `path` if given.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Read`] if `path` cannot be read
    /// * See [`Self::from_toml`]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::from_toml(DEFAULT_TOML);
        };

        log::info!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.classify.n_init == 0 {
            return Err(ConfigError::Invalid {
                key: "classify.n_init",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.classify.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "classify.max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        let weights = &self.classify.risk_weights;
        if [weights.age, weights.usage, weights.density]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(ConfigError::Invalid {
                key: "classify.risk_weights",
                reason: "weights must be finite and non-negative".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.district.low_usage_quantile) {
            return Err(ConfigError::Invalid {
                key: "district.low_usage_quantile",
                reason: format!("{} is outside [0, 1]", self.district.low_usage_quantile),
            });
        }
        Ok(())
    }
}
