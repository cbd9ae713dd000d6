//! # Epi Forecast
//!
//! A Rust library for forecasting epidemic time series and summarising the
//! forecasts as ranked, human-readable insights.
//!
//! ## Features
//!
//! - Tidy epidemic tables (disease, country, date, metric columns) loaded with polars
//! - Damped-trend exponential smoothing with epidemic-curve damping
//! - A small feed-forward sequence regression network
//! - Confidence bands that widen with the forecast horizon
//! - Batch forecasts with per-country failure isolation
//! - Projection of a historical outbreak onto another calendar year
//! - Trend metrics and natural-language insights
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use epi_forecast::data::DataLoader;
//! use epi_forecast::insights::{metric_display_name, InsightGenerator};
//! use epi_forecast::models::ForecastMethod;
//! use epi_forecast::Forecaster;
//!
//! # fn main() -> epi_forecast::Result<()> {
//! // Load data
//! let table = DataLoader::from_csv("unified.csv")?;
//!
//! // Forecast every country reporting measles
//! let forecaster = Forecaster::new();
//! let countries = table.countries("measles")?;
//! let forecasts = forecaster.batch_forecast(
//!     &table,
//!     "measles",
//!     &countries,
//!     "new_cases",
//!     ForecastMethod::ExponentialSmoothing,
//! );
//!
//! // Rank the movers
//! let insights = InsightGenerator::new().generate_batch_insights(
//!     &forecasts,
//!     "measles",
//!     &metric_display_name("new_cases"),
//! );
//! for insight in &insights {
//!     println!("{}", insight.insight);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod forecaster;
pub mod insights;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use crate::config::ForecasterConfig;
pub use crate::data::{DataLoader, EpidemicRecord, EpidemicTable, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::forecaster::{ForecastResult, Forecaster, ProjectionResult};
pub use crate::insights::{InsightGenerator, InsightRecord, TrendMetrics};
pub use crate::models::{ForecastBand, ForecastMethod, ForecastModel, TrainedForecastModel};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
