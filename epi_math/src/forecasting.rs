//! Trend and level estimators used by the forecasting models
//!
//! Contains:
//! - Linear Regression over a trailing window (trend slope)
//! - Simple Exponential Smoothing (current level)

use crate::{ensure_finite, MathError, Result};
use std::collections::VecDeque;

/// Least-squares linear regression over the most recent `period` values.
///
/// The x axis is the position inside the window (0, 1, 2, ...), so the
/// slope is expressed in units per observation.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    period: usize,
    values: VecDeque<f64>,
    slope: Option<f64>,
    intercept: Option<f64>,
}

impl LinearRegression {
    /// Create a new Linear Regression with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period < 2 {
            return Err(MathError::InvalidInput(
                "Period must be at least 2 for linear regression".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            slope: None,
            intercept: None,
        })
    }

    /// Fit a regression over the last `period` entries of `values`
    pub fn from_values(period: usize, values: &[f64]) -> Result<Self> {
        let mut regression = Self::new(period)?;
        for &value in values {
            regression.update(value)?;
        }
        Ok(regression)
    }

    /// Update the Linear Regression with a new value
    pub fn update(&mut self, value: f64) -> Result<()> {
        self.values.push_back(ensure_finite(value)?);

        if self.values.len() > self.period {
            self.values.pop_front();
        }

        if self.values.len() >= 2 {
            self.calculate_regression()?;
        }

        Ok(())
    }

    fn calculate_regression(&mut self) -> Result<()> {
        let n = self.values.len() as f64;

        let x_mean = (0..self.values.len()).map(|i| i as f64).sum::<f64>() / n;
        let y_mean = self.values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for (i, &y) in self.values.iter().enumerate() {
            let x = i as f64;
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        if denominator.abs() < 1e-10 {
            return Err(MathError::CalculationError(
                "Cannot calculate slope: x values are too similar".to_string(),
            ));
        }

        let slope = numerator / denominator;
        let intercept = y_mean - slope * x_mean;

        self.slope = Some(slope);
        self.intercept = Some(intercept);

        Ok(())
    }

    /// Get the current slope (trend direction and strength)
    pub fn slope(&self) -> Result<f64> {
        self.slope.ok_or_else(|| {
            MathError::InsufficientData("Not enough data to calculate slope".to_string())
        })
    }

    /// Get the current intercept
    pub fn intercept(&self) -> Result<f64> {
        self.intercept.ok_or_else(|| {
            MathError::InsufficientData("Not enough data to calculate intercept".to_string())
        })
    }

    /// Number of values currently inside the window
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values have been observed yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }
}

/// Simple exponential smoothing: `level = alpha * value + (1 - alpha) * level`
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    alpha: f64,
    level: Option<f64>,
    values_seen: usize,
}

impl ExponentialSmoothing {
    /// Create a new Exponential Smoothing with the specified alpha (smoothing factor)
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(MathError::InvalidInput(
                "Alpha must be between 0 and 1 (exclusive)".to_string(),
            ));
        }

        Ok(Self {
            alpha,
            level: None,
            values_seen: 0,
        })
    }

    /// Smooth a whole series and return the final level
    pub fn smooth(alpha: f64, values: &[f64]) -> Result<f64> {
        let mut smoother = Self::new(alpha)?;
        for &value in values {
            smoother.update(value)?;
        }
        smoother.value()
    }

    /// Update the Exponential Smoothing with a new value
    pub fn update(&mut self, value: f64) -> Result<()> {
        let value = ensure_finite(value)?;
        self.values_seen += 1;

        self.level = Some(match self.level {
            // The first observation seeds the level
            None => value,
            Some(current_level) => self.alpha * value + (1.0 - self.alpha) * current_level,
        });

        Ok(())
    }

    /// Get the current smoothed value
    pub fn value(&self) -> Result<f64> {
        self.level.ok_or_else(|| {
            MathError::InsufficientData("No data available for exponential smoothing".to_string())
        })
    }

    /// Number of observations folded into the level
    pub fn values_seen(&self) -> usize {
        self.values_seen
    }

    /// Get the current alpha value
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_regression() {
        let mut lr = LinearRegression::new(3).unwrap();

        lr.update(10.0).unwrap();
        lr.update(20.0).unwrap();
        lr.update(30.0).unwrap();

        assert_relative_eq!(lr.slope().unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(lr.intercept().unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_regression_keeps_trailing_window() {
        // Only the last three values (5, 4, 3) are in the window
        let lr = LinearRegression::from_values(3, &[1.0, 2.0, 5.0, 4.0, 3.0]).unwrap();

        assert_eq!(lr.len(), 3);
        assert_relative_eq!(lr.slope().unwrap(), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_regression_needs_two_points() {
        let lr = LinearRegression::from_values(14, &[7.0]).unwrap();
        assert!(lr.slope().is_err());
        assert!(LinearRegression::new(1).is_err());
    }

    #[test]
    fn test_linear_regression_rejects_non_finite() {
        let mut lr = LinearRegression::new(5).unwrap();
        assert!(lr.update(f64::INFINITY).is_err());
    }

    #[test]
    fn test_exponential_smoothing() {
        let mut es = ExponentialSmoothing::new(0.3).unwrap();

        es.update(10.0).unwrap();
        assert_relative_eq!(es.value().unwrap(), 10.0);

        // 0.3 * 20 + 0.7 * 10
        es.update(20.0).unwrap();
        assert_relative_eq!(es.value().unwrap(), 13.0, epsilon = 1e-9);
        assert_eq!(es.values_seen(), 2);
    }

    #[test]
    fn test_exponential_smoothing_bounds() {
        assert!(ExponentialSmoothing::new(0.0).is_err());
        assert!(ExponentialSmoothing::new(1.0).is_err());
        assert!(ExponentialSmoothing::smooth(0.3, &[]).is_err());
    }
}
