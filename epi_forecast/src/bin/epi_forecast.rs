//! Forecast a disease metric for a set of countries and print ranked insights
//!
//! ```text
//! epi-forecast <csv> <disease> <metric> [--countries a,b] [--method smoothing|network]
//!              [--project YEAR] [--config file.toml]
//! ```

use epi_forecast::insights::{metric_display_name, InsightRecord};
use epi_forecast::{
    DataLoader, ForecastError, ForecastMethod, Forecaster, ForecasterConfig, InsightGenerator,
    Result,
};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: epi-forecast <csv> <disease> <metric> [--countries a,b] \
[--method smoothing|network] [--project YEAR] [--config file.toml]";

/// Parsed command line
#[derive(Debug)]
struct Options {
    csv: String,
    disease: String,
    metric: String,
    countries: Option<Vec<String>>,
    method: ForecastMethod,
    project: Option<i32>,
    config: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut positional = Vec::new();
    let mut countries: Option<Vec<String>> = None;
    let mut method = ForecastMethod::default();
    let mut project: Option<i32> = None;
    let mut config = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next().cloned().ok_or_else(|| {
                ForecastError::InvalidParameter(format!("{} requires a value", flag))
            })
        };

        match arg.as_str() {
            "--countries" => {
                countries = Some(
                    value("--countries")?
                        .split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect(),
                )
            }
            "--method" => method = value("--method")?.parse()?,
            "--project" => {
                let year = value("--project")?;
                project = Some(year.parse().map_err(|_| {
                    ForecastError::InvalidParameter(format!("Invalid year: {}", year))
                })?)
            }
            "--config" => config = Some(value("--config")?),
            flag if flag.starts_with("--") => {
                return Err(ForecastError::InvalidParameter(format!(
                    "Unknown option: {}",
                    flag
                )))
            }
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() != 3 {
        return Err(ForecastError::InvalidParameter(USAGE.to_string()));
    }
    let metric = positional.remove(2);
    let disease = positional.remove(1);
    let csv = positional.remove(0);

    Ok(Options {
        csv,
        disease,
        metric,
        countries,
        method,
        project,
        config,
    })
}

fn run(options: Options) -> Result<Vec<InsightRecord>> {
    let config = match &options.config {
        Some(path) => ForecasterConfig::from_file(path)?,
        None => ForecasterConfig::default(),
    };
    let insight_generator = InsightGenerator::from_settings(&config.insights);
    let forecaster = Forecaster::with_config(config)?;

    let table = DataLoader::from_csv(&options.csv)?;
    let countries = match options.countries {
        Some(countries) => countries,
        None => table.countries(&options.disease)?,
    };
    let metric_name = metric_display_name(&options.metric);

    let insights = match options.project {
        Some(year) => {
            let projections = forecaster.batch_project_to_current_year(
                &table,
                &options.disease,
                &countries,
                &options.metric,
                year,
                options.method,
            );
            insight_generator.generate_scenario_insights(&projections, &options.disease, &metric_name)
        }
        None => {
            let forecasts = forecaster.batch_forecast(
                &table,
                &options.disease,
                &countries,
                &options.metric,
                options.method,
            );
            insight_generator.generate_batch_insights(&forecasts, &options.disease, &metric_name)
        }
    };

    Ok(insights)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    match run(options).and_then(|insights| InsightRecord::list_to_json(&insights)) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!(error = %e, "Forecast run failed");
            process::exit(1);
        }
    }
}
