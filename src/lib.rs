//! # EpiAccess
//!
//! `epiaccess` bundles the epidemic forecasting workspace:
//!
//! - [`forecast`]: tidy tables, forecast models, projections and insights
//! - [`math`]: trend, smoothing, volatility and error primitives
//!
//! ## Example
//!
//! ```
//! use epiaccess::forecast::{EpidemicRecord, EpidemicTable, ForecastMethod, ForecasterConfig};
//!
//! let records: Vec<EpidemicRecord> = (0..30)
//!     .map(|i| {
//!         let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
//!             + chrono::Duration::days(i);
//!         EpidemicRecord::new("measles", "Chad", date).with_metric("new_cases", 10.0 + i as f64)
//!     })
//!     .collect();
//! let table = EpidemicTable::from_records(&records).unwrap();
//!
//! let insights = epiaccess::country_insights(
//!     &table,
//!     "measles",
//!     "new_cases",
//!     ForecastMethod::ExponentialSmoothing,
//!     &ForecasterConfig::default(),
//! )
//! .unwrap();
//! assert_eq!(insights.len(), 1);
//! ```

pub use epi_forecast as forecast;
pub use epi_math as math;

use epi_forecast::insights::{metric_display_name, InsightRecord};
use epi_forecast::{EpidemicTable, ForecastMethod, Forecaster, ForecasterConfig, InsightGenerator};

/// Forecast every country reporting `disease` and rank the resulting insights.
///
/// Countries without enough history still get an entry describing why no
/// forecast was made.
pub fn country_insights(
    table: &EpidemicTable,
    disease: &str,
    metric: &str,
    method: ForecastMethod,
    config: &ForecasterConfig,
) -> forecast::Result<Vec<InsightRecord>> {
    let forecaster = Forecaster::with_config(config.clone())?;
    let countries = table.countries(disease)?;
    let forecasts = forecaster.batch_forecast(table, disease, &countries, metric, method);

    Ok(InsightGenerator::from_settings(&config.insights).generate_batch_insights(
        &forecasts,
        disease,
        &metric_display_name(metric),
    ))
}

/// Replay every country's history from January 1 of `target_year` and rank
/// the scenario insights
pub fn scenario_insights(
    table: &EpidemicTable,
    disease: &str,
    metric: &str,
    target_year: i32,
    method: ForecastMethod,
    config: &ForecasterConfig,
) -> forecast::Result<Vec<InsightRecord>> {
    let forecaster = Forecaster::with_config(config.clone())?;
    let countries = table.countries(disease)?;
    let projections =
        forecaster.batch_project_to_current_year(table, disease, &countries, metric, target_year, method);

    Ok(InsightGenerator::from_settings(&config.insights).generate_scenario_insights(
        &projections,
        disease,
        &metric_display_name(metric),
    ))
}
