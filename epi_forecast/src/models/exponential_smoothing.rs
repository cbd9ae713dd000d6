//! Exponential smoothing with a damped linear trend
//!
//! The current level comes from simple exponential smoothing over the whole
//! history; the trend is the least-squares slope of the last two weeks. The
//! trend contribution decays by `0.98^i`, and a rising trend is additionally
//! bent over after day 30 so projected outbreaks plateau instead of growing
//! without bound.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastBand, ForecastModel, TrainedForecastModel};
use epi_math::{ExponentialSmoothing, LinearRegression, RollingVolatility};

/// Observations used for the trend slope
const TREND_WINDOW: usize = 14;
/// Observations used for the band volatility
const VOLATILITY_WINDOW: usize = 21;
/// Below this many points the forecast is flat
const MIN_TREND_POINTS: usize = 3;
/// Per-day decay of the trend contribution
const TREND_DAMPING: f64 = 0.98;
/// Day after which a rising trend starts to bend over
const EPIDEMIC_ONSET_DAY: usize = 30;
/// Per-day decay of a rising trend after the onset day
const EPIDEMIC_DECAY: f64 = 0.95;
/// Lower limit of the epidemic decay factor
const EPIDEMIC_DECAY_FLOOR: f64 = 0.1;

/// Damped-trend exponential smoothing model
#[derive(Debug, Clone)]
pub struct DampedExponentialSmoothing {
    /// Name of the model
    name: String,
    /// Smoothing parameter
    alpha: f64,
}

/// State extracted from the history
#[derive(Debug, Clone, Copy, PartialEq)]
enum SmoothingFit {
    /// Too little history for a trend
    Flat { last_value: f64 },
    Damped {
        level: f64,
        slope: f64,
        volatility: f64,
    },
}

/// Trained damped exponential smoothing model
#[derive(Debug, Clone)]
pub struct TrainedDampedSmoothing {
    /// Name of the model
    name: String,
    fit: SmoothingFit,
}

impl DampedExponentialSmoothing {
    /// Create a new model with smoothing weight `alpha` on new observations
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Alpha must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Exponential Smoothing (alpha={})", alpha),
            alpha,
        })
    }

    /// Get the smoothing parameter
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl ForecastModel for DampedExponentialSmoothing {
    type Trained = TrainedDampedSmoothing;

    fn train(&self, series: &TimeSeries) -> Result<Self::Trained> {
        let values = series.values();

        let fit = if values.len() < MIN_TREND_POINTS {
            SmoothingFit::Flat {
                last_value: series.last_value(),
            }
        } else {
            let slope = LinearRegression::from_values(TREND_WINDOW, values)?.slope()?;
            let level = ExponentialSmoothing::smooth(self.alpha, values)?;
            let volatility = RollingVolatility::from_values(VOLATILITY_WINDOW, values)?.value()?;

            SmoothingFit::Damped {
                level,
                slope,
                volatility,
            }
        };

        tracing::debug!(points = values.len(), ?fit, "Trained damped exponential smoothing");

        Ok(TrainedDampedSmoothing {
            name: self.name.clone(),
            fit,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedDampedSmoothing {
    /// Smoothed level the forecast starts from, if a trend was fitted
    pub fn level(&self) -> Option<f64> {
        match self.fit {
            SmoothingFit::Damped { level, .. } => Some(level),
            SmoothingFit::Flat { .. } => None,
        }
    }

    /// Fitted trend slope per day, if a trend was fitted
    pub fn slope(&self) -> Option<f64> {
        match self.fit {
            SmoothingFit::Damped { slope, .. } => Some(slope),
            SmoothingFit::Flat { .. } => None,
        }
    }
}

/// Multiplier applied to the trend contribution on forecast day `i`
fn trend_multiplier(slope: f64, i: usize) -> f64 {
    let damping = TREND_DAMPING.powi(i as i32);

    let epidemic_damping = if slope > 0.0 && i > EPIDEMIC_ONSET_DAY {
        EPIDEMIC_DECAY
            .powi((i - EPIDEMIC_ONSET_DAY) as i32)
            .max(EPIDEMIC_DECAY_FLOOR)
    } else {
        1.0
    };

    damping * epidemic_damping
}

impl TrainedForecastModel for TrainedDampedSmoothing {
    fn forecast(&self, horizon: usize) -> Result<ForecastBand> {
        match self.fit {
            SmoothingFit::Flat { last_value } => Ok(ForecastBand::flat(last_value, horizon)),
            SmoothingFit::Damped {
                level,
                slope,
                volatility,
            } => {
                let values = (0..horizon)
                    .map(|i| (level + slope * i as f64 * trend_multiplier(slope, i)).max(0.0))
                    .collect();

                Ok(ForecastBand::widening(values, volatility))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::new(dates, values.to_vec()).unwrap()
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(DampedExponentialSmoothing::new(0.0).is_err());
        assert!(DampedExponentialSmoothing::new(1.2).is_err());
    }

    #[test]
    fn test_short_series_is_flat() {
        let model = DampedExponentialSmoothing::new(0.3).unwrap();
        let band = model.train(&series(&[10.0, 20.0])).unwrap().forecast(5).unwrap();

        assert_eq!(band.values(), &[20.0; 5]);
        assert_relative_eq!(band.lower()[0], 14.0, epsilon = 1e-9);
        assert_relative_eq!(band.upper()[4], 26.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_series_stays_constant() {
        let model = DampedExponentialSmoothing::new(0.3).unwrap();
        let band = model.train(&series(&[50.0; 20])).unwrap().forecast(180).unwrap();

        assert!(band.values().iter().all(|&v| (v - 50.0).abs() < 1e-9));
        // Zero volatility collapses the band onto the forecast
        assert!(band.upper().iter().all(|&v| (v - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_level_and_slope() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + 10.0 * i as f64).collect();
        let trained = DampedExponentialSmoothing::new(0.3)
            .unwrap()
            .train(&series(&values))
            .unwrap();

        assert_relative_eq!(trained.slope().unwrap(), 10.0, epsilon = 1e-9);
        let level = trained.level().unwrap();
        assert!(level > 250.0 && level < 290.0);
    }

    #[test]
    fn test_trend_multiplier() {
        assert_relative_eq!(trend_multiplier(5.0, 0), 1.0);
        assert_relative_eq!(trend_multiplier(5.0, 30), 0.98_f64.powi(30), epsilon = 1e-12);
        assert_relative_eq!(
            trend_multiplier(5.0, 40),
            0.98_f64.powi(40) * 0.95_f64.powi(10),
            epsilon = 1e-12
        );
        // Far out the epidemic decay is held at its floor
        assert_relative_eq!(trend_multiplier(5.0, 150), 0.98_f64.powi(150) * 0.1, epsilon = 1e-12);
        // Falling trends only get the plain damping
        assert_relative_eq!(trend_multiplier(-5.0, 40), 0.98_f64.powi(40), epsilon = 1e-12);
    }

    #[test]
    fn test_declining_series_floors_at_zero() {
        let values: Vec<f64> = (0..20).map(|i| (200.0 - 15.0 * i as f64).max(0.0)).collect();
        let band = DampedExponentialSmoothing::new(0.3)
            .unwrap()
            .train(&series(&values))
            .unwrap()
            .forecast(180)
            .unwrap();

        assert!(band.values().iter().all(|&v| v >= 0.0));
        assert!(band.lower().iter().all(|&v| v >= 0.0));
    }
}
