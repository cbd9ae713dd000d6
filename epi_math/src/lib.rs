//! # Epi Math
//!
//! Numeric building blocks for epidemic time series forecasting.
//! Nothing in this crate knows about diseases or countries; it works on
//! plain `f64` slices and small stateful estimators.

use thiserror::Error;

pub mod accuracy;
pub mod forecasting;
pub mod volatility;

pub use accuracy::{mean_absolute_error, mean_squared_error};
pub use forecasting::{ExponentialSmoothing, LinearRegression};
pub use volatility::RollingVolatility;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

pub(crate) fn ensure_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MathError::InvalidInput(format!(
            "Value must be finite, got {}",
            value
        )))
    }
}
