//! Forecasting models for epidemic time series

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// z-score of a two-sided 95% interval
pub(crate) const Z_95: f64 = 1.96;

/// Relative half-width of the flat fallback band
const FLAT_BAND_RATIO: f64 = 0.3;

/// Central forecast with its lower and upper bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBand {
    values: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ForecastBand {
    /// Create a band, checking that all three sequences line up
    pub fn new(values: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if values.len() != lower.len() || values.len() != upper.len() {
            return Err(ForecastError::ModelError(format!(
                "Band lengths differ: values {}, lower {}, upper {}",
                values.len(),
                lower.len(),
                upper.len()
            )));
        }

        Ok(Self {
            values,
            lower,
            upper,
        })
    }

    /// Flat forecast at `last_value` with static ±30% bounds
    pub fn flat(last_value: f64, horizon: usize) -> Self {
        let last_value = last_value.max(0.0);
        Self {
            values: vec![last_value; horizon],
            lower: vec![(last_value * (1.0 - FLAT_BAND_RATIO)).max(0.0); horizon],
            upper: vec![last_value * (1.0 + FLAT_BAND_RATIO); horizon],
        }
    }

    /// Build a band around `values` from a base error scale.
    ///
    /// The half-width at step `i` is `1.96 * scale * (1 + i / horizon)`. The
    /// lower bound is floored at zero; if that flooring would make the band
    /// narrower than at the previous step, the upper bound is raised so the
    /// width never shrinks with the horizon.
    pub fn widening(values: Vec<f64>, scale: f64) -> Self {
        let horizon = values.len().max(1) as f64;
        let mut lower = Vec::with_capacity(values.len());
        let mut upper = Vec::with_capacity(values.len());
        let mut previous_width = 0.0_f64;

        for (i, &value) in values.iter().enumerate() {
            let half_width = Z_95 * scale * (1.0 + i as f64 / horizon);
            let low = (value - half_width).max(0.0);
            let high = (value + half_width).max(low + previous_width);

            previous_width = high - low;
            lower.push(low);
            upper.push(high);
        }

        Self {
            values,
            lower,
            upper,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Number of forecast steps
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    /// Split into `(values, lower, upper)`
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (self.values, self.lower, self.upper)
    }
}

/// Forecasting algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Damped exponential smoothing with a linear trend
    #[default]
    ExponentialSmoothing,
    /// Small feed-forward network over a sliding window
    SequenceRegression,
}

impl ForecastMethod {
    /// Human-readable label reported with each forecast
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMethod::ExponentialSmoothing => "Exponential Smoothing",
            ForecastMethod::SequenceRegression => "Neural Network (Sequence Regression)",
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ForecastMethod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "smoothing" | "exponential_smoothing" | "es" => Ok(ForecastMethod::ExponentialSmoothing),
            "network" | "neural" | "sequence_regression" | "nn" => {
                Ok(ForecastMethod::SequenceRegression)
            }
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown forecast method: {}",
                other
            ))),
        }
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate a forecast band for `horizon` future steps
    fn forecast(&self, horizon: usize) -> Result<ForecastBand>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a time series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a time series
    fn train(&self, series: &TimeSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod exponential_smoothing;
pub mod neural_network;

pub use exponential_smoothing::DampedExponentialSmoothing;
pub use neural_network::FeedForwardRegressor;
