//! Date helpers shared by forecasts and projections

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};

/// Consecutive calendar days starting the day after `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::with_capacity(horizon);
    let mut current = last_date;

    for _ in 0..horizon {
        current = current.checked_add_signed(Duration::days(1)).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "Forecast horizon of {} days from {} is out of range",
                horizon, last_date
            ))
        })?;
        dates.push(current);
    }

    Ok(dates)
}

/// `"YYYY-MM-DD to YYYY-MM-DD"` description of a date range
pub fn format_period(first: NaiveDate, last: NaiveDate) -> String {
    format!("{} to {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
}

/// January 1 of `year`
pub fn start_of_year(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ForecastError::InvalidParameter(format!("Invalid target year: {}", year)))
}
