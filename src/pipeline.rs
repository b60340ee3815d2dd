use std::path::PathBuf;

use jiff::Zoned;
use log::info;

use crate::config::EtlConfig;
use crate::db::openweather::client::WeatherSource;
use crate::db::openweather::current_weather_archive::LoadReport;
use crate::db::openweather::extract::Extractor;
use crate::db::openweather::transform::transform;
use crate::db::prod_db::ProdDb;
use crate::locations::configured_locations;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing was extracted, no file or table was written.
    NoData,
    Completed {
        rows: usize,
        csv_path: PathBuf,
        report: LoadReport,
    },
}

/// Extract, transform and load the weather for all configured locations.
pub fn run<S: WeatherSource>(config: &EtlConfig, source: &S) -> RunOutcome {
    let locations = configured_locations(config);

    info!("Extracting weather data for {} locations ...", locations.len());
    let records = Extractor::new(config, source).extract(&locations);

    info!("Transforming data ...");
    let table = match transform(records) {
        Some(table) => table,
        None => {
            info!("No data to process. ETL pipeline stopped.");
            return RunOutcome::NoData;
        }
    };

    let archive = ProdDb::maharashtra_weather(config);
    let csv_path = archive.filename(&Zoned::now());
    let report = archive.load(&table, &csv_path, &locations);
    info!("ETL pipeline completed");

    RunOutcome::Completed {
        rows: table.len(),
        csv_path,
        report,
    }
}
