use chrono::{Duration, NaiveDate};
use epi_forecast::insights::metric_display_name;
use epi_forecast::{EpidemicRecord, EpidemicTable, ForecastMethod, Forecaster, InsightGenerator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Epi Forecast: Scenario Projection Example");
    println!("=========================================\n");

    // A 2014 outbreak curve, reported every other day
    let start = NaiveDate::from_ymd_opt(2014, 3, 22).expect("valid date");
    let records: Vec<EpidemicRecord> = (0..45)
        .map(|i| {
            let t = i as f64;
            EpidemicRecord::new("ebola", "Guinea", start + Duration::days(2 * i))
                .with_metric("new_cases", 400.0 * (-((t - 25.0) / 9.0).powi(2)).exp())
        })
        .collect();
    let table = EpidemicTable::from_records(&records)?;

    let forecaster = Forecaster::new();
    let projection = forecaster.project_to_current_year(
        &table,
        "ebola",
        "Guinea",
        "new_cases",
        2025,
        ForecastMethod::ExponentialSmoothing,
    )?;

    println!(
        "Original period: {} ({} days)",
        projection.original_period().unwrap_or("-"),
        projection.duration_days().unwrap_or(0)
    );
    println!(
        "Projected start: {}",
        projection
            .projected_dates()
            .first()
            .map(|d| d.to_string())
            .unwrap_or_default()
    );
    println!("Forecast continuation: {} days\n", projection.forecast_values().len());

    let mut projections = std::collections::BTreeMap::new();
    projections.insert("Guinea".to_string(), projection);

    let insights = InsightGenerator::new().generate_scenario_insights(
        &projections,
        "ebola",
        &metric_display_name("new_cases"),
    );
    for insight in &insights {
        println!("{}", insight.insight);
    }
    println!("\nThese insights describe a projected scenario, not a prediction.");

    Ok(())
}
