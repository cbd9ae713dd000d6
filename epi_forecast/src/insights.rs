//! Trend metrics and natural-language insights from forecasts
//!
//! Forecast values are read at calendar-day positions: index 0 is the
//! current value, index 29 is about one month out and index 89 about three
//! months out. Both indices are clamped to the last forecast step when the
//! horizon is shorter.

use crate::config::InsightSettings;
use crate::error::Result;
use crate::forecaster::{ForecastResult, ProjectionResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Forecast index of the one-month reading
const ONE_MONTH_INDEX: usize = 29;
/// Forecast index of the three-month reading
const THREE_MONTH_INDEX: usize = 89;
/// Histories at least this long give high confidence
const HIGH_CONFIDENCE_POINTS: usize = 30;
/// Histories at least this long give medium confidence
const MEDIUM_CONFIDENCE_POINTS: usize = 14;

/// Direction of the near-term forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendClass {
    Stable,
    Increasing,
    Decreasing,
    /// The forecast was unsuccessful
    InsufficientData,
    /// The forecast succeeded but has no values
    NoForecast,
}

impl TrendClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendClass::Stable => "stable",
            TrendClass::Increasing => "increasing",
            TrendClass::Decreasing => "decreasing",
            TrendClass::InsufficientData => "insufficient_data",
            TrendClass::NoForecast => "no_forecast",
        }
    }
}

impl fmt::Display for TrendClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence derived from the amount of history behind a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Confidence for a history of `points` observations
    pub fn from_history_len(points: usize) -> Self {
        if points >= HIGH_CONFIDENCE_POINTS {
            ConfidenceLevel::High
        } else if points >= MEDIUM_CONFIDENCE_POINTS {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }

    /// Parenthetical qualifier appended to insight text
    fn qualifier(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => " (low confidence)",
            ConfidenceLevel::Medium => "",
            ConfidenceLevel::High => " (high confidence)",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend summary of one forecast.
///
/// Percentage changes are relative to the first forecast value (floored at
/// 1). They are absent when the forecast was unsuccessful or empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendMetrics {
    pub trend: TrendClass,
    pub confidence: ConfidenceLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_month_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_month_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub six_month_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_value: Option<f64>,
    /// 1-based forecast day of the peak
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_day: Option<usize>,
}

impl TrendMetrics {
    fn without_forecast(trend: TrendClass) -> Self {
        Self {
            trend,
            confidence: ConfidenceLevel::Low,
            one_month_change: None,
            three_month_change: None,
            six_month_change: None,
            current_value: None,
            peak_value: None,
            peak_day: None,
        }
    }
}

/// One ranked insight line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightRecord {
    pub country: String,
    pub disease: String,
    pub insight: String,
    pub trend: TrendClass,
    pub confidence: ConfidenceLevel,
    pub change_1m: f64,
    pub change_3m: f64,
}

impl InsightRecord {
    /// Serialize a list of insights to pretty JSON
    pub fn list_to_json(insights: &[InsightRecord]) -> Result<String> {
        Ok(serde_json::to_string_pretty(insights)?)
    }
}

/// `new_cases` -> `new cases`
pub fn metric_display_name(metric: &str) -> String {
    metric.replace('_', " ")
}

/// Turns forecasts into graded insights
#[derive(Debug, Clone, PartialEq)]
pub struct InsightGenerator {
    significance_threshold: f64,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::from_settings(&InsightSettings::default())
    }
}

impl InsightGenerator {
    /// Create a generator with the default 10% significance threshold
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator with a custom relative threshold (0.1 = 10%)
    pub fn with_threshold(significance_threshold: f64) -> Self {
        Self {
            significance_threshold,
        }
    }

    pub fn from_settings(settings: &InsightSettings) -> Self {
        Self::with_threshold(settings.significance_threshold)
    }

    pub fn significance_threshold(&self) -> f64 {
        self.significance_threshold
    }

    /// Threshold expressed in percent
    fn threshold_percent(&self) -> f64 {
        self.significance_threshold * 100.0
    }

    /// Percentage changes, peak and confidence of one forecast
    pub fn calculate_trend_metrics(&self, forecast: &ForecastResult) -> TrendMetrics {
        if !forecast.is_success() {
            return TrendMetrics::without_forecast(TrendClass::InsufficientData);
        }

        let values = forecast.forecast_values();
        let (current, last) = match (values.first(), values.last()) {
            (Some(&current), Some(&last)) => (current, last),
            _ => return TrendMetrics::without_forecast(TrendClass::NoForecast),
        };

        let at = |index: usize| values.get(index).copied().unwrap_or(last);
        let denominator = current.max(1.0);
        let change = |value: f64| (value - current) / denominator * 100.0;

        let one_month_change = change(at(ONE_MONTH_INDEX));
        let three_month_change = change(at(THREE_MONTH_INDEX));
        let six_month_change = change(last);

        let trend = if one_month_change.abs() < self.threshold_percent() {
            TrendClass::Stable
        } else if one_month_change > 0.0 {
            TrendClass::Increasing
        } else {
            TrendClass::Decreasing
        };

        // First occurrence of the maximum
        let (peak_index, peak_value) = values
            .iter()
            .copied()
            .enumerate()
            .fold((0, current), |best, (i, v)| if v > best.1 { (i, v) } else { best });

        let history_len = forecast.historical().map_or(0, |h| h.len());

        TrendMetrics {
            trend,
            confidence: ConfidenceLevel::from_history_len(history_len),
            one_month_change: Some(one_month_change),
            three_month_change: Some(three_month_change),
            six_month_change: Some(six_month_change),
            current_value: Some(current),
            peak_value: Some(peak_value),
            peak_day: Some(peak_index + 1),
        }
    }

    /// One-sentence summary of a country's trend.
    ///
    /// The larger of the one- and three-month changes is reported, with its
    /// timeframe.
    pub fn generate_insight_text(
        &self,
        country: &str,
        disease: &str,
        metrics: &TrendMetrics,
        metric_name: &str,
    ) -> String {
        match metrics.trend {
            TrendClass::InsufficientData => {
                return format!(
                    "{}: Insufficient data for reliable {} forecast",
                    country, disease
                )
            }
            TrendClass::NoForecast => {
                return format!("{}: Unable to generate {} forecast", country, disease)
            }
            _ => {}
        }

        let change_1m = metrics.one_month_change.unwrap_or(0.0);
        let change_3m = metrics.three_month_change.unwrap_or(0.0);

        let (primary_change, timeframe) = if change_1m.abs() > change_3m.abs() {
            (change_1m, "next month")
        } else {
            (change_3m, "next 3 months")
        };

        let confidence = metrics.confidence.qualifier();

        if primary_change.abs() < self.threshold_percent() {
            format!(
                "{}: {} {} expected to remain stable in {}{}",
                country, disease, metric_name, timeframe, confidence
            )
        } else {
            let direction = if primary_change > 0.0 {
                "increase"
            } else {
                "decrease"
            };
            format!(
                "{}: {:.0}% {} in {} {} forecast for {}{}",
                country,
                primary_change.abs(),
                direction,
                disease,
                metric_name,
                timeframe,
                confidence
            )
        }
    }

    /// Insights for every country, largest absolute one-month change first
    pub fn generate_batch_insights(
        &self,
        forecasts: &BTreeMap<String, ForecastResult>,
        disease: &str,
        metric_name: &str,
    ) -> Vec<InsightRecord> {
        let mut insights: Vec<InsightRecord> = forecasts
            .iter()
            .map(|(country, forecast)| {
                let metrics = self.calculate_trend_metrics(forecast);
                InsightRecord {
                    country: country.clone(),
                    disease: disease.to_string(),
                    insight: self.generate_insight_text(country, disease, &metrics, metric_name),
                    trend: metrics.trend,
                    confidence: metrics.confidence,
                    change_1m: metrics.one_month_change.unwrap_or(0.0),
                    change_3m: metrics.three_month_change.unwrap_or(0.0),
                }
            })
            .collect();

        // Stable sort keeps country order among equal changes
        insights.sort_by(|a, b| b.change_1m.abs().total_cmp(&a.change_1m.abs()));
        insights
    }

    /// Insights for year projections, worded as scenarios
    pub fn generate_scenario_insights(
        &self,
        projections: &BTreeMap<String, ProjectionResult>,
        disease: &str,
        metric_name: &str,
    ) -> Vec<InsightRecord> {
        let forecasts: BTreeMap<String, ForecastResult> = projections
            .iter()
            .map(|(country, projection)| (country.clone(), projection.to_forecast()))
            .collect();

        self.generate_batch_insights(&forecasts, disease, metric_name)
            .into_iter()
            .map(|mut record| {
                record.insight = record.insight.replace("forecast", "projected scenario");
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeries;
    use crate::models::{ForecastBand, ForecastMethod};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn forecast(country: &str, history_len: usize, values: Vec<f64>) -> ForecastResult {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dates = (0..history_len)
            .map(|i| start + Duration::days(i as i64))
            .collect();
        let history = TimeSeries::new(dates, vec![10.0; history_len]).unwrap();
        let band = ForecastBand::widening(values, 1.0);
        ForecastResult::from_parts(
            "measles",
            country,
            "new_cases",
            history,
            band,
            ForecastMethod::ExponentialSmoothing,
        )
        .unwrap()
    }

    fn metrics(trend: TrendClass, change_1m: f64, change_3m: f64) -> TrendMetrics {
        TrendMetrics {
            trend,
            confidence: ConfidenceLevel::Medium,
            one_month_change: Some(change_1m),
            three_month_change: Some(change_3m),
            six_month_change: Some(change_3m),
            current_value: Some(100.0),
            peak_value: Some(100.0),
            peak_day: Some(1),
        }
    }

    #[test]
    fn test_unsuccessful_forecast() {
        let failed = ForecastResult::failed("measles", "Chad", "new_cases", "Insufficient data");
        let metrics = InsightGenerator::new().calculate_trend_metrics(&failed);

        assert_eq!(metrics.trend, TrendClass::InsufficientData);
        assert_eq!(metrics.confidence, ConfidenceLevel::Low);
        assert_eq!(metrics.one_month_change, None);
    }

    #[test]
    fn test_empty_forecast() {
        let metrics = InsightGenerator::new().calculate_trend_metrics(&forecast("Chad", 20, vec![]));
        assert_eq!(metrics.trend, TrendClass::NoForecast);
        assert_eq!(metrics.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_changes_and_peak() {
        let values: Vec<f64> = (0..180).map(|i| 100.0 + i as f64).collect();
        let metrics = InsightGenerator::new().calculate_trend_metrics(&forecast("Peru", 40, values));

        assert_eq!(metrics.trend, TrendClass::Increasing);
        assert_eq!(metrics.confidence, ConfidenceLevel::High);
        assert_relative_eq!(metrics.one_month_change.unwrap(), 29.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.three_month_change.unwrap(), 89.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.six_month_change.unwrap(), 179.0, epsilon = 1e-9);
        assert_eq!(metrics.peak_value, Some(279.0));
        assert_eq!(metrics.peak_day, Some(180));
    }

    #[test]
    fn test_short_horizon_clamps_indices() {
        let values = vec![10.0, 12.0, 8.0, 15.0, 11.0];
        let metrics = InsightGenerator::new().calculate_trend_metrics(&forecast("Peru", 20, values));

        assert_relative_eq!(metrics.one_month_change.unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.three_month_change.unwrap(), 10.0, epsilon = 1e-9);
        assert_eq!(metrics.peak_day, Some(4));
    }

    #[test]
    fn test_small_current_value_uses_unit_denominator() {
        let mut values = vec![0.0; 180];
        values[29] = 5.0;
        let metrics = InsightGenerator::new().calculate_trend_metrics(&forecast("Peru", 20, values));

        assert_relative_eq!(metrics.one_month_change.unwrap(), 500.0, epsilon = 1e-9);
        assert_eq!(metrics.trend, TrendClass::Increasing);
    }

    #[rstest]
    #[case(5, ConfidenceLevel::Low)]
    #[case(13, ConfidenceLevel::Low)]
    #[case(14, ConfidenceLevel::Medium)]
    #[case(29, ConfidenceLevel::Medium)]
    #[case(30, ConfidenceLevel::High)]
    fn test_confidence_from_history(#[case] points: usize, #[case] expected: ConfidenceLevel) {
        assert_eq!(ConfidenceLevel::from_history_len(points), expected);
    }

    #[test]
    fn test_larger_short_term_change_wins() {
        let text = InsightGenerator::new().generate_insight_text(
            "Brazil",
            "dengue",
            &metrics(TrendClass::Increasing, 50.0, 20.0),
            "new cases",
        );
        assert_eq!(text, "Brazil: 50% increase in dengue new cases forecast for next month");
    }

    #[test]
    fn test_three_month_change_and_confidence() {
        let mut m = metrics(TrendClass::Stable, -5.0, -40.4);
        m.confidence = ConfidenceLevel::High;
        let text = InsightGenerator::new().generate_insight_text("Chile", "flu", &m, "new deaths");
        assert_eq!(
            text,
            "Chile: 40% decrease in flu new deaths forecast for next 3 months (high confidence)"
        );
    }

    #[test]
    fn test_stable_text() {
        let mut m = metrics(TrendClass::Stable, 2.0, -3.0);
        m.confidence = ConfidenceLevel::Low;
        let text = InsightGenerator::new().generate_insight_text("Chile", "flu", &m, "new cases");
        assert_eq!(
            text,
            "Chile: flu new cases expected to remain stable in next 3 months (low confidence)"
        );
    }

    #[test]
    fn test_special_texts() {
        let generator = InsightGenerator::new();
        let insufficient = TrendMetrics::without_forecast(TrendClass::InsufficientData);
        let empty = TrendMetrics::without_forecast(TrendClass::NoForecast);

        assert_eq!(
            generator.generate_insight_text("Mali", "cholera", &insufficient, "new cases"),
            "Mali: Insufficient data for reliable cholera forecast"
        );
        assert_eq!(
            generator.generate_insight_text("Mali", "cholera", &empty, "new cases"),
            "Mali: Unable to generate cholera forecast"
        );
    }

    #[test]
    fn test_batch_insights_sorted_by_one_month_change() {
        let mut forecasts = BTreeMap::new();
        forecasts.insert("A".to_string(), forecast("A", 20, vec![100.0; 180]));
        forecasts.insert(
            "B".to_string(),
            forecast("B", 20, (0..180).map(|i| 100.0 + 2.0 * i as f64).collect()),
        );
        forecasts.insert(
            "C".to_string(),
            forecast("C", 20, (0..180).map(|i| (100.0 - i as f64).max(0.0)).collect()),
        );
        forecasts.insert(
            "D".to_string(),
            ForecastResult::failed("measles", "D", "new_cases", "Insufficient data"),
        );

        let insights = InsightGenerator::new().generate_batch_insights(&forecasts, "measles", "new cases");
        let order: Vec<&str> = insights.iter().map(|r| r.country.as_str()).collect();

        assert_eq!(order, vec!["B", "C", "A", "D"]);
        assert_relative_eq!(insights[0].change_1m, 58.0, epsilon = 1e-9);
        assert_eq!(insights[3].trend, TrendClass::InsufficientData);
    }

    #[test]
    fn test_metric_display_name() {
        assert_eq!(metric_display_name("new_cases"), "new cases");
        assert_eq!(metric_display_name("total_deaths"), "total deaths");
    }
}
