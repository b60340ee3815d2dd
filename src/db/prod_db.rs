use crate::config::EtlConfig;

use super::openweather::current_weather_archive::CurrentWeatherArchive;

pub struct ProdDb {}

impl ProdDb {
    pub fn maharashtra_weather(config: &EtlConfig) -> CurrentWeatherArchive {
        CurrentWeatherArchive {
            base_dir: config.output_dir.clone(),
            duckdb_path: config.duckdb_path(),
            table_name: config.table_name.clone(),
            parent_district: config.parent_district.clone(),
        }
    }
}
