use chrono::{Duration, NaiveDate};
use epi_forecast::data::{DataLoader, EpidemicRecord, EpidemicTable, TimeSeries};
use epi_forecast::error::ForecastError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn daily_records(disease: &str, country: &str, days: usize, value: impl Fn(usize) -> f64) -> Vec<EpidemicRecord> {
    let start = date("2021-06-01");
    (0..days)
        .map(|i| {
            EpidemicRecord::new(disease, country, start + Duration::days(i as i64))
                .with_metric("new_cases", value(i))
        })
        .collect()
}

#[test]
fn test_data_loader_from_csv() {
    let file = write_csv(&[
        "disease,country,date,new_cases,new_deaths",
        "measles,Chad,2023-01-01,10,0",
        "measles,Chad,2023-01-02,12,1",
        "measles,Mali,2023-01-01,3,",
        "cholera,Mali,2023-01-01,7,2",
    ]);

    let table = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(table.len(), 4);
    assert!(!table.is_empty());
    assert_eq!(table.diseases().unwrap(), vec!["cholera", "measles"]);
    assert_eq!(table.countries("measles").unwrap(), vec!["Chad", "Mali"]);
    assert_eq!(table.metric_columns(), vec!["new_cases", "new_deaths"]);
}

#[test]
fn test_location_column_is_accepted() {
    let file = write_csv(&[
        "Disease,Location,Date,new_cases",
        "flu,Chile,2022-05-01,4",
        "flu,Chile,2022-05-02,6",
    ]);

    let table = DataLoader::from_csv(file.path()).unwrap();
    let series = table.prepare("flu", "Chile", "new_cases", 2).unwrap().unwrap();
    assert_eq!(series.values(), &[4.0, 6.0]);
}

#[test]
fn test_missing_required_column() {
    let file = write_csv(&["disease,date,new_cases", "flu,2022-05-01,4"]);
    let result = DataLoader::from_csv(file.path());
    assert!(matches!(result, Err(ForecastError::DataError(_))));
}

#[test]
fn test_missing_file() {
    let result = DataLoader::from_csv("/nonexistent/unified.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));
}

#[test]
fn test_prepare_cleans_series() {
    let file = write_csv(&[
        "disease,country,date,new_cases",
        "measles,Chad,2023-01-03,-4",
        "measles,Chad,2023-01-01,10",
        "measles,Chad,2023-01-02,",
        "measles,Chad,2023-01-04,8",
        "measles,Mali,2023-01-01,99",
    ]);
    let table = DataLoader::from_csv(file.path()).unwrap();

    let series = table.prepare("measles", "Chad", "new_cases", 3).unwrap().unwrap();

    // Sorted by date, missing value filled with zero, negative clamped
    assert_eq!(
        series.dates(),
        &[
            date("2023-01-01"),
            date("2023-01-02"),
            date("2023-01-03"),
            date("2023-01-04")
        ]
    );
    assert_eq!(series.values(), &[10.0, 0.0, 0.0, 8.0]);
}

#[test]
fn test_prepare_sums_rows_sharing_a_date() {
    let mut records = daily_records("covid", "Canada", 14, |_| 5.0);
    records.push(EpidemicRecord::new("covid", "Canada", date("2021-06-01")).with_metric("new_cases", 7.0));
    let table = EpidemicTable::from_records(&records).unwrap();

    let series = table.prepare("covid", "Canada", "new_cases", 14).unwrap().unwrap();
    assert_eq!(series.len(), 14);
    assert_eq!(series.values()[0], 12.0);
}

#[test]
fn test_prepare_requires_minimum_points() {
    let table = EpidemicTable::from_records(&daily_records("covid", "Fiji", 13, |i| i as f64)).unwrap();

    assert!(table.prepare("covid", "Fiji", "new_cases", 14).unwrap().is_none());
    assert!(table.prepare("covid", "Tonga", "new_cases", 14).unwrap().is_none());
    assert!(table.prepare("covid", "Fiji", "new_cases", 13).unwrap().is_some());
}

#[test]
fn test_duplicate_dates_count_once_toward_minimum() {
    let mut records = daily_records("covid", "Fiji", 10, |_| 1.0);
    records.extend(daily_records("covid", "Fiji", 10, |_| 2.0));
    let table = EpidemicTable::from_records(&records).unwrap();

    // 20 rows but only 10 distinct dates
    assert!(table.prepare("covid", "Fiji", "new_cases", 14).unwrap().is_none());
}

#[test]
fn test_prepare_rejects_malformed_input() {
    let table = EpidemicTable::from_records(&daily_records("covid", "Fiji", 20, |i| {
        if i == 5 {
            f64::INFINITY
        } else {
            1.0
        }
    }))
    .unwrap();

    assert!(matches!(
        table.prepare("covid", "Fiji", "new_cases", 14),
        Err(ForecastError::DataError(_))
    ));
    assert!(matches!(
        table.prepare("covid", "Fiji", "total_cases", 14),
        Err(ForecastError::DataError(_))
    ));
}

#[test]
fn test_unparseable_date() {
    let file = write_csv(&[
        "disease,country,date,new_cases",
        "flu,Chile,2022-05-01,4",
        "flu,Chile,not-a-date,6",
    ]);
    let table = DataLoader::from_csv(file.path()).unwrap();

    assert!(table.prepare("flu", "Chile", "new_cases", 1).is_err());
}

#[test]
fn test_summary() {
    let mut records = daily_records("covid", "Fiji", 20, |i| i as f64);
    records.extend(daily_records("covid", "Samoa", 5, |i| 100.0 * i as f64));
    records.extend(daily_records("flu", "Fiji", 3, |_| 1000.0));
    let table = EpidemicTable::from_records(&records).unwrap();

    let summary = table.summary("covid", "new_cases").unwrap();

    assert_eq!(summary.records, 25);
    assert_eq!(summary.countries, 2);
    assert_eq!(summary.first_date, Some(date("2021-06-01")));
    assert_eq!(summary.last_date, Some(date("2021-06-20")));
    assert_eq!(summary.peak_value, 400.0);
    assert_eq!(
        summary.top_countries,
        vec![("Samoa".to_string(), 400.0), ("Fiji".to_string(), 19.0)]
    );
}

#[test]
fn test_records_missing_a_metric_get_zero() {
    let mut records = daily_records("covid", "Fiji", 14, |_| 3.0);
    records.push(
        EpidemicRecord::new("covid", "Fiji", date("2021-06-15")).with_metric("new_deaths", 1.0),
    );
    let table = EpidemicTable::from_records(&records).unwrap();

    let series = table.prepare("covid", "Fiji", "new_cases", 14).unwrap().unwrap();
    assert_eq!(series.len(), 15);
    assert_eq!(series.last_value(), 0.0);
}

#[test]
fn test_time_series_observations() {
    let series = TimeSeries::new(
        vec![date("2020-01-01"), date("2020-01-03")],
        vec![1.0, 2.0],
    )
    .unwrap();

    let observations: Vec<_> = series.observations().collect();
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[1].date, date("2020-01-03"));
    assert_eq!(TimeSeries::from_observations(&observations).unwrap(), series);
}
