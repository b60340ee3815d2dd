use std::{error::Error, path::Path, path::PathBuf};

use clap::Parser;
use log::{info, warn};
use maha_weather::{
    config::{EtlConfig, LocationSet},
    db::openweather::client::OpenWeatherClient,
    pipeline::{run, RunOutcome},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Json file with the districts and sub-districts to fetch
    #[arg(short, long)]
    locations: Option<PathBuf>,

    /// Directory for the CSV files and the DuckDB file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

/// Run this job every hour
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if let Err(e) = dotenvy::from_path(Path::new(&env_file)) {
        warn!("Could not load {}: {}", env_file, e);
    }

    let mut config = EtlConfig::from_env()?;
    if let Some(path) = args.locations {
        config = config.with_locations(LocationSet::from_path(&path)?);
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let client = OpenWeatherClient::new(&config)?;
    match run(&config, &client) {
        RunOutcome::NoData => info!("No rows written"),
        RunOutcome::Completed { rows, csv_path, .. } => {
            info!("{} rows written to {}", rows, csv_path.display())
        }
    }

    Ok(())
}
