//! Per-country forecasts, batch runs and year projections
//!
//! [`Forecaster`] ties the table, the models and the configuration together.
//! Insufficient history is a normal outcome and is reported through a result
//! with `success == false`; malformed input surfaces as an `Err` from the
//! single-country calls and as a failed entry from the batch calls.

use crate::config::ForecasterConfig;
use crate::data::{EpidemicTable, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{
    DampedExponentialSmoothing, FeedForwardRegressor, ForecastBand, ForecastMethod,
    ForecastModel, TrainedForecastModel,
};
use crate::utils::{format_period, future_dates, start_of_year};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Results report the method by its display label
fn serialize_method_label<S: Serializer>(
    method: &Option<ForecastMethod>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match method {
        Some(method) => serializer.serialize_some(method.label()),
        None => serializer.serialize_none(),
    }
}

/// Outcome of forecasting one (disease, country, metric) series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    disease: String,
    country: String,
    metric: String,
    last_date: Option<NaiveDate>,
    forecast_dates: Vec<NaiveDate>,
    forecast_values: Vec<f64>,
    lower_bound: Vec<f64>,
    upper_bound: Vec<f64>,
    historical: Option<TimeSeries>,
    #[serde(serialize_with = "serialize_method_label")]
    method: Option<ForecastMethod>,
}

impl ForecastResult {
    /// Build a successful result from a history and the band forecast from it.
    ///
    /// Forecast dates are the consecutive days after the last historical date.
    pub fn from_parts(
        disease: impl Into<String>,
        country: impl Into<String>,
        metric: impl Into<String>,
        historical: TimeSeries,
        band: ForecastBand,
        method: ForecastMethod,
    ) -> Result<Self> {
        let last_date = historical.last_date().ok_or_else(|| {
            ForecastError::DataError("Cannot forecast from an empty history".to_string())
        })?;
        let forecast_dates = future_dates(last_date, band.horizon())?;
        let (forecast_values, lower_bound, upper_bound) = band.into_parts();

        Ok(Self {
            success: true,
            message: None,
            disease: disease.into(),
            country: country.into(),
            metric: metric.into(),
            last_date: Some(last_date),
            forecast_dates,
            forecast_values,
            lower_bound,
            upper_bound,
            historical: Some(historical),
            method: Some(method),
        })
    }

    /// Unsuccessful result with empty forecast arrays
    pub fn failed(
        disease: impl Into<String>,
        country: impl Into<String>,
        metric: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            disease: disease.into(),
            country: country.into(),
            metric: metric.into(),
            last_date: None,
            forecast_dates: Vec::new(),
            forecast_values: Vec::new(),
            lower_bound: Vec::new(),
            upper_bound: Vec::new(),
            historical: None,
            method: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Diagnostic message of an unsuccessful result
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn disease(&self) -> &str {
        &self.disease
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Last observed date of the history
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    pub fn forecast_dates(&self) -> &[NaiveDate] {
        &self.forecast_dates
    }

    pub fn forecast_values(&self) -> &[f64] {
        &self.forecast_values
    }

    pub fn lower_bound(&self) -> &[f64] {
        &self.lower_bound
    }

    pub fn upper_bound(&self) -> &[f64] {
        &self.upper_bound
    }

    /// Series the forecast was computed from
    pub fn historical(&self) -> Option<&TimeSeries> {
        self.historical.as_ref()
    }

    pub fn method(&self) -> Option<ForecastMethod> {
        self.method
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Historical outbreak re-dated onto a target year, plus its continuation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    disease: String,
    country: String,
    metric: String,
    target_year: i32,
    /// `"YYYY-MM-DD to YYYY-MM-DD"` range of the original history
    original_period: Option<String>,
    /// Days between the first and last original observation
    duration_days: Option<i64>,
    projected: Option<TimeSeries>,
    forecast_dates: Vec<NaiveDate>,
    forecast_values: Vec<f64>,
    lower_bound: Vec<f64>,
    upper_bound: Vec<f64>,
    #[serde(serialize_with = "serialize_method_label")]
    method: Option<ForecastMethod>,
}

impl ProjectionResult {
    /// Unsuccessful projection with empty arrays
    pub fn failed(
        disease: impl Into<String>,
        country: impl Into<String>,
        metric: impl Into<String>,
        target_year: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            disease: disease.into(),
            country: country.into(),
            metric: metric.into(),
            target_year,
            original_period: None,
            duration_days: None,
            projected: None,
            forecast_dates: Vec::new(),
            forecast_values: Vec::new(),
            lower_bound: Vec::new(),
            upper_bound: Vec::new(),
            method: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn disease(&self) -> &str {
        &self.disease
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    pub fn original_period(&self) -> Option<&str> {
        self.original_period.as_deref()
    }

    pub fn duration_days(&self) -> Option<i64> {
        self.duration_days
    }

    /// Re-dated history
    pub fn projected(&self) -> Option<&TimeSeries> {
        self.projected.as_ref()
    }

    pub fn projected_dates(&self) -> &[NaiveDate] {
        self.projected.as_ref().map(TimeSeries::dates).unwrap_or_default()
    }

    pub fn projected_values(&self) -> &[f64] {
        self.projected.as_ref().map(TimeSeries::values).unwrap_or_default()
    }

    pub fn forecast_dates(&self) -> &[NaiveDate] {
        &self.forecast_dates
    }

    pub fn forecast_values(&self) -> &[f64] {
        &self.forecast_values
    }

    pub fn lower_bound(&self) -> &[f64] {
        &self.lower_bound
    }

    pub fn upper_bound(&self) -> &[f64] {
        &self.upper_bound
    }

    pub fn method(&self) -> Option<ForecastMethod> {
        self.method
    }

    /// View the projection as a forecast whose history is the re-dated series
    pub fn to_forecast(&self) -> ForecastResult {
        ForecastResult {
            success: self.success,
            message: self.message.clone(),
            disease: self.disease.clone(),
            country: self.country.clone(),
            metric: self.metric.clone(),
            last_date: self.projected.as_ref().and_then(TimeSeries::last_date),
            forecast_dates: self.forecast_dates.clone(),
            forecast_values: self.forecast_values.clone(),
            lower_bound: self.lower_bound.clone(),
            upper_bound: self.upper_bound.clone(),
            historical: self.projected.clone(),
            method: self.method,
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Forecasting engine
#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    config: ForecasterConfig,
}

impl Forecaster {
    /// Create a forecaster with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecaster from a validated configuration
    pub fn with_config(config: ForecasterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    /// Clean series for one disease, country and metric, or `None` when
    /// fewer than `min_data_points` dates are available
    pub fn prepare(
        &self,
        table: &EpidemicTable,
        disease: &str,
        country: &str,
        metric: &str,
    ) -> Result<Option<TimeSeries>> {
        table.prepare(disease, country, metric, self.config.min_data_points)
    }

    /// Damped-trend exponential smoothing over the configured horizon
    pub fn exponential_smoothing_forecast(
        &self,
        series: &TimeSeries,
        alpha: f64,
    ) -> Result<ForecastBand> {
        let model = DampedExponentialSmoothing::new(alpha)?;
        model.train(series)?.forecast(self.config.forecast_days)
    }

    /// Feed-forward sequence regression over the configured horizon
    pub fn sequence_regression_forecast(&self, series: &TimeSeries) -> Result<ForecastBand> {
        let settings = &self.config.network;
        let model = FeedForwardRegressor::new(
            settings.input_size,
            settings.hidden_size,
            settings.epochs,
        )?
        .with_learning_rate(settings.learning_rate)?
        .with_seed(settings.seed);

        model.train(series)?.forecast(self.config.forecast_days)
    }

    /// Alias of [`Forecaster::sequence_regression_forecast`]
    pub fn pytorch_forecast(&self, series: &TimeSeries) -> Result<ForecastBand> {
        self.sequence_regression_forecast(series)
    }

    /// Forecast a prepared series with the chosen method
    pub fn forecast_series(&self, series: &TimeSeries, method: ForecastMethod) -> Result<ForecastBand> {
        tracing::debug!(
            method = %method,
            points = series.len(),
            horizon = self.config.forecast_days,
            "Running forecast"
        );

        match method {
            ForecastMethod::ExponentialSmoothing => {
                self.exponential_smoothing_forecast(series, self.config.smoothing.alpha)
            }
            ForecastMethod::SequenceRegression => self.sequence_regression_forecast(series),
        }
    }

    /// Forecast one country
    pub fn generate_forecast(
        &self,
        table: &EpidemicTable,
        disease: &str,
        country: &str,
        metric: &str,
        method: ForecastMethod,
    ) -> Result<ForecastResult> {
        let series = match self.prepare(table, disease, country, metric)? {
            Some(series) => series,
            None => {
                return Ok(ForecastResult::failed(
                    disease,
                    country,
                    metric,
                    format!("Insufficient data for {} - {}", country, disease),
                ))
            }
        };

        let band = self.forecast_series(&series, method)?;
        ForecastResult::from_parts(disease, country, metric, series, band, method)
    }

    /// Forecast every country independently.
    ///
    /// A country whose forecast fails gets an unsuccessful entry; the other
    /// countries are unaffected.
    pub fn batch_forecast<S: AsRef<str>>(
        &self,
        table: &EpidemicTable,
        disease: &str,
        countries: &[S],
        metric: &str,
        method: ForecastMethod,
    ) -> BTreeMap<String, ForecastResult> {
        tracing::info!(disease, metric, countries = countries.len(), %method, "Batch forecast");

        countries
            .iter()
            .map(|country| {
                let country = country.as_ref();
                let result = self
                    .generate_forecast(table, disease, country, metric, method)
                    .unwrap_or_else(|e| {
                        tracing::warn!(country, error = %e, "Forecast failed");
                        ForecastResult::failed(
                            disease,
                            country,
                            metric,
                            format!("Error forecasting for {}: {}", country, e),
                        )
                    });
                (country.to_string(), result)
            })
            .collect()
    }

    /// Replay a country's history from January 1 of `target_year` and
    /// forecast what follows it
    pub fn project_to_current_year(
        &self,
        table: &EpidemicTable,
        disease: &str,
        country: &str,
        metric: &str,
        target_year: i32,
        method: ForecastMethod,
    ) -> Result<ProjectionResult> {
        let start = start_of_year(target_year)?;

        let series = match self.prepare(table, disease, country, metric)? {
            Some(series) => series,
            None => {
                return Ok(ProjectionResult::failed(
                    disease,
                    country,
                    metric,
                    target_year,
                    format!("Insufficient data for {} - {}", country, disease),
                ))
            }
        };

        let (first, last) = match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(ForecastError::DataError(format!(
                    "Empty history for {} - {}",
                    country, disease
                )))
            }
        };

        let projected = series.redate(start)?;
        let band = self.forecast_series(&projected, method)?;
        let projected_last = projected.last_date().unwrap_or(start);
        let forecast_dates = future_dates(projected_last, band.horizon())?;
        let (forecast_values, lower_bound, upper_bound) = band.into_parts();

        tracing::debug!(
            country,
            target_year,
            original_start = %first,
            "Projected history onto target year"
        );

        Ok(ProjectionResult {
            success: true,
            message: None,
            disease: disease.to_string(),
            country: country.to_string(),
            metric: metric.to_string(),
            target_year,
            original_period: Some(format_period(first, last)),
            duration_days: Some((last - first).num_days()),
            projected: Some(projected),
            forecast_dates,
            forecast_values,
            lower_bound,
            upper_bound,
            method: Some(method),
        })
    }

    /// Project every country independently
    pub fn batch_project_to_current_year<S: AsRef<str>>(
        &self,
        table: &EpidemicTable,
        disease: &str,
        countries: &[S],
        metric: &str,
        target_year: i32,
        method: ForecastMethod,
    ) -> BTreeMap<String, ProjectionResult> {
        tracing::info!(
            disease,
            metric,
            countries = countries.len(),
            target_year,
            "Batch projection"
        );

        countries
            .iter()
            .map(|country| {
                let country = country.as_ref();
                let result = self
                    .project_to_current_year(table, disease, country, metric, target_year, method)
                    .unwrap_or_else(|e| {
                        tracing::warn!(country, target_year, error = %e, "Projection failed");
                        ProjectionResult::failed(
                            disease,
                            country,
                            metric,
                            target_year,
                            format!("Error projecting {} to {}: {}", country, target_year, e),
                        )
                    });
                (country.to_string(), result)
            })
            .collect()
    }
}
