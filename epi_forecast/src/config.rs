//! Forecaster configuration
//!
//! Every field has a default, so an empty TOML document yields the
//! standard 180-day setup:
//!
//! ```toml
//! forecast_days = 180
//! min_data_points = 14
//!
//! [smoothing]
//! alpha = 0.3
//!
//! [network]
//! input_size = 7
//! hidden_size = 16
//! epochs = 100
//! learning_rate = 0.01
//! seed = 42
//!
//! [insights]
//! significance_threshold = 0.1
//! ```

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration for [`crate::Forecaster`] and [`crate::InsightGenerator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecasterConfig {
    /// Number of future days to forecast
    #[serde(default = "default_forecast_days")]
    pub forecast_days: usize,
    /// Minimum number of distinct dates a series needs to be forecast
    #[serde(default = "default_min_data_points")]
    pub min_data_points: usize,
    #[serde(default)]
    pub smoothing: SmoothingSettings,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub insights: InsightSettings,
}

/// Damped exponential smoothing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingSettings {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

/// Sequence regression network parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Length of the sliding input window
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Seed for weight initialisation
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Insight generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSettings {
    /// Relative one-month change below which a trend counts as stable
    #[serde(default = "default_significance_threshold")]
    pub significance_threshold: f64,
}

fn default_forecast_days() -> usize {
    180
}

fn default_min_data_points() -> usize {
    14
}

fn default_alpha() -> f64 {
    0.3
}

fn default_input_size() -> usize {
    7
}

fn default_hidden_size() -> usize {
    16
}

fn default_epochs() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_seed() -> u64 {
    42
}

fn default_significance_threshold() -> f64 {
    0.1
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            forecast_days: default_forecast_days(),
            min_data_points: default_min_data_points(),
            smoothing: SmoothingSettings::default(),
            network: NetworkSettings::default(),
            insights: InsightSettings::default(),
        }
    }
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            hidden_size: default_hidden_size(),
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            seed: default_seed(),
        }
    }
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            significance_threshold: default_significance_threshold(),
        }
    }
}

impl ForecasterConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ForecasterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ForecastError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.forecast_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast_days must be at least 1".to_string(),
            ));
        }
        if self.min_data_points == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_data_points must be at least 1".to_string(),
            ));
        }
        if self.smoothing.alpha <= 0.0 || self.smoothing.alpha >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Alpha must be between 0 and 1".to_string(),
            ));
        }
        if self.network.input_size == 0 || self.network.hidden_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Network input_size and hidden_size must be positive".to_string(),
            ));
        }
        if !(self.network.learning_rate > 0.0) {
            return Err(ForecastError::InvalidParameter(
                "Network learning_rate must be positive".to_string(),
            ));
        }
        if !(self.insights.significance_threshold >= 0.0) {
            return Err(ForecastError::InvalidParameter(
                "significance_threshold must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
