//! Tidy epidemic tables and per-country time series
//!
//! An [`EpidemicTable`] holds the caller's unified dataset (one row per
//! disease, country and date, with one or more numeric metric columns).
//! [`EpidemicTable::prepare`] cuts a single clean [`TimeSeries`] out of it.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One row of the unified dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpidemicRecord {
    pub disease: String,
    pub country: String,
    pub date: NaiveDate,
    /// Metric name to value, e.g. `new_cases -> 120.0`
    pub metrics: BTreeMap<String, f64>,
}

impl EpidemicRecord {
    pub fn new(disease: impl Into<String>, country: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            disease: disease.into(),
            country: country.into(),
            date,
            metrics: BTreeMap::new(),
        }
    }

    /// Attach a metric value to the record
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

/// A single dated observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Daily-or-irregular series for one (disease, country, metric) triple.
///
/// Dates are strictly increasing and values are finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series from parallel date and value vectors.
    ///
    /// Negative values are clamped to zero.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }

        if let Some(pair) = dates.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(ForecastError::DataError(format!(
                "Dates must be strictly increasing: {} followed by {}",
                pair[0], pair[1]
            )));
        }

        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Series contains a non-finite value: {}",
                bad
            )));
        }

        let values = values.into_iter().map(|v| v.max(0.0)).collect();

        Ok(Self { dates, values })
    }

    /// Create a series from a list of observations
    pub fn from_observations(observations: &[Observation]) -> Result<Self> {
        Self::new(
            observations.iter().map(|o| o.date).collect(),
            observations.iter().map(|o| o.value).collect(),
        )
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over (date, value) pairs
    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.dates
            .iter()
            .zip(self.values.iter())
            .map(|(&date, &value)| Observation { date, value })
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Last observed value, or zero for an empty series
    pub fn last_value(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    /// Whole days between the first and last observation
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        }
    }

    /// Copy of the series moved so that it starts on `start`.
    ///
    /// Values are kept verbatim and every observation keeps its day offset
    /// from the first date.
    pub fn redate(&self, start: NaiveDate) -> Result<Self> {
        let origin = match self.first_date() {
            Some(origin) => origin,
            None => return Ok(self.clone()),
        };

        let dates = self
            .dates
            .iter()
            .map(|&date| {
                let offset = date - origin;
                start.checked_add_signed(offset).ok_or_else(|| {
                    ForecastError::InvalidParameter(format!(
                        "Cannot shift {} by {} days from {}",
                        date,
                        offset.num_days(),
                        start
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            dates,
            values: self.values.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-disease overview of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseSummary {
    pub disease: String,
    pub records: usize,
    pub countries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Largest single value of the metric across all countries
    pub peak_value: f64,
    /// Up to five countries with the highest peak of the metric
    pub top_countries: Vec<(String, f64)>,
}

/// Data loader for tidy epidemic tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a tidy table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<EpidemicTable> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let table = EpidemicTable::from_dataframe(df)?;
        tracing::info!(
            path = %path.as_ref().display(),
            rows = table.len(),
            "Loaded epidemic table"
        );
        Ok(table)
    }

    /// Create a table from an existing DataFrame
    pub fn from_dataframe(df: DataFrame) -> Result<EpidemicTable> {
        EpidemicTable::from_dataframe(df)
    }
}

/// Typed view of the date column, read one row at a time
enum DateColumn {
    Days(Int32Chunked),
    Timestamps { ticks: Int64Chunked, per_day: i64 },
    Text(Utf8Chunked),
}

impl DateColumn {
    fn new(col: &Series) -> Result<Self> {
        match col.dtype() {
            DataType::Date => Ok(DateColumn::Days(col.cast(&DataType::Int32)?.i32()?.clone())),
            DataType::Datetime(unit, _) => {
                let per_day: i64 = match unit {
                    TimeUnit::Nanoseconds => 86_400_000_000_000,
                    TimeUnit::Microseconds => 86_400_000_000,
                    TimeUnit::Milliseconds => 86_400_000,
                };
                Ok(DateColumn::Timestamps {
                    ticks: col.cast(&DataType::Int64)?.i64()?.clone(),
                    per_day,
                })
            }
            DataType::Utf8 => Ok(DateColumn::Text(col.utf8()?.clone())),
            other => Err(ForecastError::DataError(format!(
                "Column '{}' has unsupported date type {:?}",
                col.name(),
                other
            ))),
        }
    }

    fn get(&self, row: usize) -> Result<Option<NaiveDate>> {
        match self {
            DateColumn::Days(days) => days
                .get(row)
                .map(|d| date_from_epoch_days(d as i64))
                .transpose(),
            DateColumn::Timestamps { ticks, per_day } => ticks
                .get(row)
                .map(|ts| date_from_epoch_days(ts.div_euclid(*per_day)))
                .transpose(),
            DateColumn::Text(text) => text.get(row).map(parse_date).transpose(),
        }
    }
}

/// Parse `YYYY-MM-DD`, optionally followed by a time of day
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .map_err(|_| ForecastError::DataError(format!("Cannot parse date '{}'", text)))
}

fn date_from_epoch_days(days: i64) -> Result<NaiveDate> {
    i32::try_from(days)
        .ok()
        .and_then(|d| d.checked_add(UNIX_EPOCH_DAYS_FROM_CE))
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| ForecastError::DataError(format!("Date out of range: {} days", days)))
}

/// Row indices grouped by disease, then country
type RowIndex = BTreeMap<String, BTreeMap<String, Vec<usize>>>;

/// Tidy table with `disease`, `country`, `date` and metric columns
#[derive(Debug, Clone)]
pub struct EpidemicTable {
    df: DataFrame,
    date_column: String,
    rows: RowIndex,
}

impl EpidemicTable {
    /// Wrap a DataFrame, locating the key columns by name (case-insensitive).
    ///
    /// The disease and country columns are indexed once here; rows missing
    /// either key are never selected.
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        let disease_column = Self::detect_column(&df, |name| name == "disease")?;
        let country_column =
            Self::detect_column(&df, |name| name == "country" || name == "location")?;
        let date_column = Self::detect_time_column(&df)?;
        let rows = Self::index_rows(&df, &disease_column, &country_column)?;

        Ok(Self {
            df,
            date_column,
            rows,
        })
    }

    fn index_rows(df: &DataFrame, disease_column: &str, country_column: &str) -> Result<RowIndex> {
        let diseases = df.column(disease_column)?.cast(&DataType::Utf8)?;
        let countries = df.column(country_column)?.cast(&DataType::Utf8)?;

        let mut grouped: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
        for (row, keys) in diseases.utf8()?.into_iter().zip(countries.utf8()?).enumerate() {
            if let (Some(disease), Some(country)) = keys {
                grouped.entry((disease, country)).or_default().push(row);
            }
        }

        let mut index = RowIndex::new();
        for ((disease, country), rows) in grouped {
            index
                .entry(disease.to_string())
                .or_default()
                .insert(country.to_string(), rows);
        }
        Ok(index)
    }

    /// Build a table from in-memory records.
    ///
    /// Every metric name seen in any record becomes a column; records that
    /// lack a metric get a null in that column.
    pub fn from_records(records: &[EpidemicRecord]) -> Result<Self> {
        let metric_names: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.metrics.keys().map(String::as_str))
            .collect();

        let diseases: Vec<&str> = records.iter().map(|r| r.disease.as_str()).collect();
        let countries: Vec<&str> = records.iter().map(|r| r.country.as_str()).collect();
        let days: Vec<i32> = records
            .iter()
            .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();

        let mut columns = vec![
            Series::new("disease", diseases),
            Series::new("country", countries),
            Series::new("date", days).cast(&DataType::Date)?,
        ];

        for name in metric_names {
            let values: Vec<Option<f64>> = records
                .iter()
                .map(|r| r.metrics.get(name).copied())
                .collect();
            columns.push(Series::new(name, values));
        }

        Self::from_dataframe(DataFrame::new(columns)?)
    }

    fn detect_column(df: &DataFrame, matches: impl Fn(&str) -> bool) -> Result<String> {
        df.get_column_names()
            .iter()
            .find(|name| matches(&name.to_lowercase()))
            .map(|name| name.to_string())
            .ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Required column not found among {:?}",
                    df.get_column_names()
                ))
            })
    }

    fn detect_time_column(df: &DataFrame) -> Result<String> {
        if let Ok(name) = Self::detect_column(df, |name| name == "date") {
            return Ok(name);
        }

        if let Ok(name) = Self::detect_column(df, |name| name.contains("date")) {
            return Ok(name);
        }

        Err(ForecastError::DataError(
            "No date column found in data".to_string(),
        ))
    }

    /// Numeric columns other than the key columns
    pub fn metric_columns(&self) -> Vec<String> {
        self.df
            .get_columns()
            .iter()
            .filter(|s| s.dtype().is_numeric())
            .map(|s| s.name().to_string())
            .filter(|name| *name != self.date_column)
            .collect()
    }

    /// Distinct diseases, sorted
    pub fn diseases(&self) -> Result<Vec<String>> {
        Ok(self.rows.keys().cloned().collect())
    }

    /// Distinct countries reporting `disease`, sorted
    pub fn countries(&self, disease: &str) -> Result<Vec<String>> {
        Ok(self
            .rows
            .get(disease)
            .map(|by_country| by_country.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Row indices belonging to one disease and country
    fn matching_rows(&self, disease: &str, country: &str) -> &[usize] {
        self.rows
            .get(disease)
            .and_then(|by_country| by_country.get(country))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Extract the clean series for one disease, country and metric.
    ///
    /// Returns `Ok(None)` when fewer than `min_points` distinct dates remain.
    /// Missing metric values count as zero, negative values are clamped to
    /// zero and rows sharing a date are summed.
    pub fn prepare(
        &self,
        disease: &str,
        country: &str,
        metric: &str,
        min_points: usize,
    ) -> Result<Option<TimeSeries>> {
        if self.df.column(metric).is_err() {
            return Err(ForecastError::DataError(format!(
                "Metric column '{}' not found",
                metric
            )));
        }

        let rows = self.matching_rows(disease, country);
        if rows.len() < min_points {
            return Ok(None);
        }

        let dates = self.date_values()?;
        let values = self.metric_values(metric)?;

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for &i in rows {
            let date = dates.get(i)?.ok_or_else(|| {
                ForecastError::DataError(format!("Missing date in row {} for {}", i, country))
            })?;

            let value = values.get(i).filter(|v| !v.is_nan()).unwrap_or(0.0);
            if value.is_infinite() {
                return Err(ForecastError::DataError(format!(
                    "Non-finite {} value on {} for {}",
                    metric, date, country
                )));
            }

            *by_date.entry(date).or_insert(0.0) += value.max(0.0);
        }

        if by_date.len() < min_points {
            return Ok(None);
        }

        let (dates, values): (Vec<_>, Vec<_>) = by_date.into_iter().unzip();
        TimeSeries::new(dates, values).map(Some)
    }

    /// Summary statistics for one disease and metric
    pub fn summary(&self, disease: &str, metric: &str) -> Result<DiseaseSummary> {
        let dates = self.date_values()?;
        let values = self.metric_values(metric)?;

        let mut records = 0;
        let mut first_date: Option<NaiveDate> = None;
        let mut last_date: Option<NaiveDate> = None;
        let mut peaks: Vec<(String, f64)> = Vec::new();

        for (country, rows) in self.rows.get(disease).into_iter().flatten() {
            records += rows.len();
            let mut peak = 0.0_f64;

            for &i in rows {
                if let Ok(Some(date)) = dates.get(i) {
                    first_date = Some(first_date.map_or(date, |d| d.min(date)));
                    last_date = Some(last_date.map_or(date, |d| d.max(date)));
                }
                let value = values.get(i).filter(|v| v.is_finite()).unwrap_or(0.0);
                peak = peak.max(value);
            }
            peaks.push((country.clone(), peak));
        }

        let peak_value = peaks.iter().map(|(_, peak)| *peak).fold(0.0, f64::max);
        let country_count = peaks.len();

        let mut top_countries = peaks;
        top_countries.sort_by(|a, b| b.1.total_cmp(&a.1));
        top_countries.truncate(5);

        Ok(DiseaseSummary {
            disease: disease.to_string(),
            records,
            countries: country_count,
            first_date,
            last_date,
            peak_value,
            top_countries,
        })
    }

    /// Numeric view of a metric column
    fn metric_values(&self, column_name: &str) -> Result<Float64Chunked> {
        let col = self.df.column(column_name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
        })?;

        if !col.dtype().is_numeric() && col.dtype() != &DataType::Utf8 {
            return Err(ForecastError::DataError(format!(
                "Column '{}' cannot be converted to f64",
                column_name
            )));
        }

        Ok(col.cast(&DataType::Float64)?.f64()?.clone())
    }

    fn date_values(&self) -> Result<DateColumn> {
        DateColumn::new(self.df.column(&self.date_column)?)
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Number of rows in the table
    pub fn len(&self) -> usize {
        self.df.height()
    }
}
