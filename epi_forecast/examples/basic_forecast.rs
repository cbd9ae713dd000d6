use chrono::{Duration, NaiveDate};
use epi_forecast::insights::metric_display_name;
use epi_forecast::{EpidemicRecord, EpidemicTable, ForecastMethod, Forecaster, InsightGenerator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Epi Forecast: Basic Forecasting Example");
    println!("=======================================\n");

    // Create sample data
    println!("Creating sample data...");
    let table = EpidemicTable::from_records(&create_sample_records())?;
    println!("Sample data created: {} rows\n", table.len());

    let forecaster = Forecaster::new();
    let countries = table.countries("dengue")?;

    for method in [
        ForecastMethod::ExponentialSmoothing,
        ForecastMethod::SequenceRegression,
    ] {
        println!("Forecasting with {}...", method);
        let forecasts = forecaster.batch_forecast(&table, "dengue", &countries, "new_cases", method);

        for (country, result) in &forecasts {
            if !result.is_success() {
                println!("  {}: {}", country, result.message().unwrap_or("failed"));
                continue;
            }

            // Every 30th day of the band
            println!("  {}:", country);
            for i in (0..result.forecast_values().len()).step_by(30) {
                println!(
                    "    {}  {:>8.1}  ({:.1}, {:.1})",
                    result.forecast_dates()[i],
                    result.forecast_values()[i],
                    result.lower_bound()[i],
                    result.upper_bound()[i]
                );
            }
        }

        let insights = InsightGenerator::new().generate_batch_insights(
            &forecasts,
            "dengue",
            &metric_display_name("new_cases"),
        );
        println!("\nInsights:");
        for insight in &insights {
            println!("  [{} / {}] {}", insight.trend, insight.confidence, insight.insight);
        }
        println!();
    }

    Ok(())
}

// Three countries with a rising, a falling and a short history
fn create_sample_records() -> Vec<EpidemicRecord> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date");
    let mut records = Vec::new();

    for day in 0..60 {
        let date = start + Duration::days(day);
        let t = day as f64;

        records.push(
            EpidemicRecord::new("dengue", "Brazil", date)
                .with_metric("new_cases", 200.0 + 12.0 * t + 25.0 * (t * 0.7).sin()),
        );
        records.push(
            EpidemicRecord::new("dengue", "Peru", date)
                .with_metric("new_cases", (900.0 - 10.0 * t).max(0.0) + 15.0 * (t * 0.4).cos()),
        );
        if day < 10 {
            records.push(
                EpidemicRecord::new("dengue", "Chile", date).with_metric("new_cases", 5.0 + t),
            );
        }
    }

    records
}
