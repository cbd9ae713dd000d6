use epi_forecast::insights::{metric_display_name, InsightRecord, TrendClass};
use epi_forecast::{DataLoader, ForecastMethod, Forecaster, InsightGenerator};
use std::io::Write;
use tempfile::NamedTempFile;

// Unified-schema CSV with two diseases and uneven country coverage
fn unified_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "disease,country,date,total_cases,new_cases,total_deaths,new_deaths").unwrap();

    let mut totals = [0.0_f64; 3];
    for day in 0..45 {
        let date = chrono::NaiveDate::from_ymd_opt(2020, 3, 1).unwrap() + chrono::Duration::days(day);
        let rising = 10.0 + 6.0 * day as f64;
        let falling = (400.0 - 8.0 * day as f64).max(0.0);
        let flat = 25.0 + (day % 2) as f64;

        for (i, (country, cases)) in [("France", rising), ("Kenya", falling), ("India", flat)]
            .iter()
            .enumerate()
        {
            totals[i] += cases;
            writeln!(
                file,
                "covid,{},{},{},{},{},{}",
                country,
                date,
                totals[i],
                cases,
                (totals[i] * 0.01).round(),
                (cases * 0.01).round()
            )
            .unwrap();
        }

        if day < 6 {
            writeln!(file, "mpox,France,{},{},{},0,0", date, day + 1, 1).unwrap();
        }
    }

    file
}

#[test]
fn test_csv_to_ranked_insights() {
    let file = unified_csv();
    let table = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(table.diseases().unwrap(), vec!["covid", "mpox"]);

    let forecaster = Forecaster::new();
    let countries = table.countries("covid").unwrap();
    let forecasts = forecaster.batch_forecast(
        &table,
        "covid",
        &countries,
        "new_cases",
        ForecastMethod::ExponentialSmoothing,
    );
    assert_eq!(forecasts.len(), 3);
    assert!(forecasts.values().all(|f| f.is_success()));

    let insights = InsightGenerator::new().generate_batch_insights(
        &forecasts,
        "covid",
        &metric_display_name("new_cases"),
    );

    assert_eq!(insights.len(), 3);
    let changes: Vec<f64> = insights.iter().map(|r| r.change_1m.abs()).collect();
    assert!(changes.windows(2).all(|w| w[0] >= w[1]));

    let trend_of = |country: &str| {
        insights
            .iter()
            .find(|r| r.country == country)
            .map(|r| r.trend)
            .unwrap()
    };
    assert_eq!(trend_of("France"), TrendClass::Increasing);
    assert_eq!(trend_of("Kenya"), TrendClass::Decreasing);
    assert_eq!(trend_of("India"), TrendClass::Stable);

    // 45 days of history
    assert!(insights.iter().all(|r| r.insight.ends_with("(high confidence)")));

    let json = InsightRecord::list_to_json(&insights).unwrap();
    assert!(json.contains("\"trend\": \"increasing\""));
}

#[test]
fn test_short_disease_history() {
    let file = unified_csv();
    let table = DataLoader::from_csv(file.path()).unwrap();

    let forecasts = Forecaster::new().batch_forecast(
        &table,
        "mpox",
        &["France"],
        "new_cases",
        ForecastMethod::SequenceRegression,
    );
    let insights = InsightGenerator::new().generate_batch_insights(&forecasts, "mpox", "new cases");

    assert_eq!(insights.len(), 1);
    assert_eq!(
        insights[0].insight,
        "France: Insufficient data for reliable mpox forecast"
    );
}

#[test]
fn test_other_metrics() {
    let file = unified_csv();
    let table = DataLoader::from_csv(file.path()).unwrap();
    let forecaster = Forecaster::new();

    for metric in ["total_cases", "new_deaths", "total_deaths"] {
        let result = forecaster
            .generate_forecast(&table, "covid", "France", metric, ForecastMethod::ExponentialSmoothing)
            .unwrap();
        assert!(result.is_success(), "{}", metric);
        assert_eq!(result.metric(), metric);
    }
}

#[test]
fn test_forecast_json_round_trip_fields() {
    let file = unified_csv();
    let table = DataLoader::from_csv(file.path()).unwrap();

    let result = Forecaster::new()
        .generate_forecast(&table, "covid", "India", "new_cases", ForecastMethod::ExponentialSmoothing)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["last_date"], "2020-04-14");
    assert_eq!(json["forecast_dates"][0], "2020-04-15");
    assert_eq!(json["forecast_values"].as_array().unwrap().len(), 180);
    assert_eq!(json["method"], "Exponential Smoothing");
}
