use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use duckdb::params;
use itertools::Itertools;
use jiff::Zoned;
use log::{error, info};
use tabled::{builder::Builder, settings::Style};

use super::transform::{ComfortLevel, WeatherTable};
use crate::error::LoadError;
use crate::locations::NOT_APPLICABLE;
use crate::utils::lib_duckdb::{is_identifier, open_with_retry};

/// Where the transformed observations end up: one CSV file per run in
/// `base_dir` and a DuckDB table that grows with every run.
#[derive(Debug, Clone)]
pub struct CurrentWeatherArchive {
    pub base_dir: PathBuf,
    pub duckdb_path: PathBuf,
    pub table_name: String,
    /// District the sub-districts belong to, used in the validation summary
    pub parent_district: String,
}

/// What the two sinks managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub csv_written: bool,
    pub rows_appended: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    pub total: usize,
    pub districts: usize,
    pub sub_districts: usize,
    pub comfort_levels: BTreeMap<ComfortLevel, usize>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub mean_temperature: Option<f64>,
    /// Configured locations without a row, sorted
    pub missing: Vec<String>,
}

impl ValidationSummary {
    pub fn new(table: &WeatherTable, parent_district: &str, configured: &[String]) -> Self {
        let temperatures: Vec<f64> = table.iter().filter_map(|r| r.temperature).collect();
        let collected: HashSet<&str> = table.iter().map(|r| r.location_name.as_str()).collect();
        ValidationSummary {
            total: table.len(),
            districts: table
                .iter()
                .filter(|r| r.sub_district == NOT_APPLICABLE)
                .count(),
            sub_districts: table
                .iter()
                .filter(|r| r.district == parent_district && r.sub_district != NOT_APPLICABLE)
                .count(),
            comfort_levels: table
                .iter()
                .map(|r| r.comfort_level)
                .counts()
                .into_iter()
                .collect(),
            min_temperature: temperatures.iter().copied().reduce(f64::min),
            max_temperature: temperatures.iter().copied().reduce(f64::max),
            mean_temperature: if temperatures.is_empty() {
                None
            } else {
                Some(temperatures.iter().sum::<f64>() / temperatures.len() as f64)
            },
            missing: configured
                .iter()
                .filter(|x| !collected.contains(x.as_str()))
                .unique()
                .sorted()
                .cloned()
                .collect(),
        }
    }

    /// Make an ASCII table with the summary
    pub fn ascii_table(&self) -> tabled::Table {
        let fmt = |x: Option<f64>| match x {
            Some(v) => format!("{:.1}°C", v),
            None => "n/a".to_string(),
        };
        let mut builder = Builder::new();
        builder.push_record(vec!["Total locations covered".to_string(), self.total.to_string()]);
        builder.push_record(vec!["Districts covered".to_string(), self.districts.to_string()]);
        builder.push_record(vec![
            "Sub-districts covered".to_string(),
            self.sub_districts.to_string(),
        ]);
        for (level, count) in &self.comfort_levels {
            builder.push_record(vec![format!("Comfort level {}", level), count.to_string()]);
        }
        builder.push_record(vec![
            "Temperature range".to_string(),
            format!("{} to {}", fmt(self.min_temperature), fmt(self.max_temperature)),
        ]);
        builder.push_record(vec![
            "Average temperature".to_string(),
            fmt(self.mean_temperature),
        ]);
        let mut table = builder.build();
        table.with(Style::empty());
        table
    }

    pub fn log(&self) {
        info!("Data Validation Summary:\n{}", self.ascii_table());
        if !self.missing.is_empty() {
            info!("Missing locations:");
            for name in &self.missing {
                info!("- {}", name);
            }
        }
    }
}

impl CurrentWeatherArchive {
    /// Path of the CSV file for a run started at `now`.
    pub fn filename(&self, now: &Zoned) -> PathBuf {
        self.base_dir.join(format!(
            "maharashtra_weather_{}.csv",
            now.strftime("%Y%m%d_%H%M")
        ))
    }

    /// Run both sinks.  A failure in one is logged and doesn't stop the
    /// other one.
    pub fn load(&self, table: &WeatherTable, csv_path: &Path, configured: &[String]) -> LoadReport {
        let csv_written = match self.write_csv(table, csv_path) {
            Ok(()) => {
                info!("Data successfully saved to {}", csv_path.display());
                ValidationSummary::new(table, &self.parent_district, configured).log();
                true
            }
            Err(e) => {
                error!("Error saving to CSV {}: {}", csv_path.display(), e);
                false
            }
        };

        let rows_appended = match self.update_duckdb(table) {
            Ok(n) => {
                info!(
                    "{} rows loaded to DuckDB database: {}, table: {}",
                    n,
                    self.duckdb_path.display(),
                    self.table_name
                );
                Some(n)
            }
            Err(e) => {
                error!("Error saving to DuckDB {}: {}", self.duckdb_path.display(), e);
                None
            }
        };

        LoadReport {
            csv_written,
            rows_appended,
        }
    }

    /// Write the full table with a header row, replacing the file if it
    /// exists.
    pub fn write_csv(&self, table: &WeatherTable, path: &Path) -> Result<(), LoadError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut wtr = csv::Writer::from_path(path)?;
        for row in table.iter() {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Append all the rows to the DuckDB table, creating it if needed.
    /// Existing rows are never touched.  Return the number of rows inserted.
    pub fn update_duckdb(&self, table: &WeatherTable) -> Result<usize, LoadError> {
        if !is_identifier(&self.table_name) {
            return Err(LoadError::InvalidTable(self.table_name.clone()));
        }
        if let Some(dir) = self.duckdb_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut conn = open_with_retry(&self.duckdb_path, 8, Duration::from_millis(25))?;
        conn.execute_batch(&format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    location_name VARCHAR NOT NULL,
    district VARCHAR NOT NULL,
    sub_district VARCHAR NOT NULL,
    temperature DOUBLE,
    feels_like DOUBLE,
    min_temp DOUBLE,
    max_temp DOUBLE,
    humidity DOUBLE,
    pressure DOUBLE,
    weather_desc VARCHAR,
    wind_speed DOUBLE,
    wind_direction DOUBLE,
    cloudiness DOUBLE,
    "timestamp" TIMESTAMP NOT NULL,
    sunrise TIME,
    sunset TIME,
    latitude DOUBLE,
    longitude DOUBLE,
    error VARCHAR,
    temperature_fahrenheit DOUBLE,
    comfort_level VARCHAR NOT NULL,
    wind_direction_desc VARCHAR NOT NULL
);"#,
            self.table_name
        ))?;

        let sql = format!(
            r#"
INSERT INTO {} VALUES (
    ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
    CAST(? AS TIMESTAMP), CAST(? AS TIME), CAST(? AS TIME),
    ?, ?, ?, ?, ?, ?
);"#,
            self.table_name
        );
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in table.iter() {
                inserted += stmt.execute(params![
                    row.location_name,
                    row.district,
                    row.sub_district,
                    row.temperature,
                    row.feels_like,
                    row.min_temp,
                    row.max_temp,
                    row.humidity,
                    row.pressure,
                    row.weather_desc,
                    row.wind_speed,
                    row.wind_direction,
                    row.cloudiness,
                    row.timestamp_str(),
                    row.sunrise_str(),
                    row.sunset_str(),
                    row.latitude,
                    row.longitude,
                    row.error,
                    row.temperature_fahrenheit,
                    row.comfort_level.to_string(),
                    row.wind_direction_desc.to_string(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}
