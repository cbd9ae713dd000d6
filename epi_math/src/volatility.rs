//! Volatility estimators
//!
//! Recent volatility drives the width of forecast confidence bands.

use crate::{ensure_finite, MathError, Result};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Share of the last value used as volatility when a single observation is available
const SINGLE_POINT_VOLATILITY: f64 = 0.2;

/// Population standard deviation of the trailing `period` values
#[derive(Debug, Clone)]
pub struct RollingVolatility {
    period: usize,
    values: VecDeque<f64>,
}

impl RollingVolatility {
    /// Create a new rolling volatility estimator with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Build an estimator over the last `period` entries of `values`
    pub fn from_values(period: usize, values: &[f64]) -> Result<Self> {
        let mut volatility = Self::new(period)?;
        for &value in values {
            volatility.update(value)?;
        }
        Ok(volatility)
    }

    /// Push a new observation
    pub fn update(&mut self, value: f64) -> Result<()> {
        self.values.push_back(ensure_finite(value)?);

        if self.values.len() > self.period {
            self.values.pop_front();
        }

        Ok(())
    }

    /// Current volatility.
    ///
    /// With two or more values this is the population standard deviation of
    /// the window. A single value yields 20% of its magnitude.
    pub fn value(&self) -> Result<f64> {
        match self.values.len() {
            0 => Err(MathError::InsufficientData(
                "No data available for volatility".to_string(),
            )),
            1 => Ok(self.values[0].abs() * SINGLE_POINT_VOLATILITY),
            _ => Ok(self.values.iter().population_std_dev()),
        }
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }
}
