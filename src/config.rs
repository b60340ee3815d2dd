use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::ConfigError;

pub const OPENWEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

pub const MAHARASHTRA_DISTRICTS: &[&str] = &[
    "Ahmednagar",
    "Akola",
    "Amravati",
    "Aurangabad",
    "Beed",
    "Bhandara",
    "Buldhana",
    "Chandrapur",
    "Dhule",
    "Hingoli",
    "Jalgaon",
    "Jalna",
    "Kolhapur",
    "Latur",
    "Mumbai",
    "Thane",
    "Nagpur",
    "Nandurbar",
    "Nashik",
    "Osmanabad",
    "Palghar",
    "Parbhani",
    "Pune",
    "Raigad",
    "Ratnagiri",
    "Sangli",
    "Satara",
    "Solapur",
    "Thane",
    "Wardha",
    "Washim",
    "Yavatmal",
];

/// Talukas of the Nashik district.
pub const NASHIK_SUBDISTRICTS: &[&str] = &[
    "Trimbakeshwar",
    "Igatpuri",
    "Dindori",
    "Peth",
    "Surgana",
    "Kalwan",
    "Deola",
    "Baglan",
    "Malegaon",
    "Nandgaon",
    "Chandwad",
    "Yeola",
    "Niphad",
    "Sinnar",
];

/// Places the OpenWeatherMap geocoder doesn't know under their
/// administrative name.
pub const VENDOR_ALIASES: &[(&str, &str)] = &[
    ("Trimbakeshwar", "Trimbak,Maharashtra,IN"),
    ("Sindhudurg", "Sindhudurg Nagari,Maharashtra,IN"),
    ("Raigad", "Alibag,Maharashtra,IN"),
    ("Gadchiroli", "Gadchiroli,Maharashtra,IN"),
    ("Chandwad", "Chandvad,Maharashtra,IN"),
];

/// Location lists as read from a json file, e.g.
/// `{"districts": ["Pune"], "sub_districts": ["Igatpuri"]}`
#[derive(Debug, Clone, Deserialize)]
pub struct LocationSet {
    pub districts: Vec<String>,
    #[serde(default)]
    pub sub_districts: Vec<String>,
    pub parent_district: Option<String>,
    pub aliases: Option<BTreeMap<String, String>>,
}

impl LocationSet {
    pub fn from_path(path: &Path) -> Result<LocationSet, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub api_key: String,
    pub base_url: String,
    pub region: String,
    pub country_code: String,
    pub parent_district: String,
    pub districts: Vec<String>,
    pub sub_districts: Vec<String>,
    pub aliases: BTreeMap<String, String>,
    pub max_attempts: u32,
    /// Wait before every request, to stay under the vendor rate limit.
    pub courtesy_delay: Duration,
    /// Extra wait after a failed attempt.
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub output_dir: PathBuf,
    pub db_file_name: String,
    pub table_name: String,
}

impl EtlConfig {
    /// Default Maharashtra setup.
    pub fn new<S: Into<String>>(api_key: S) -> EtlConfig {
        EtlConfig {
            api_key: api_key.into(),
            base_url: OPENWEATHER_URL.to_string(),
            region: "Maharashtra".to_string(),
            country_code: "IN".to_string(),
            parent_district: "Nashik".to_string(),
            districts: MAHARASHTRA_DISTRICTS.iter().map(|s| s.to_string()).collect(),
            sub_districts: NASHIK_SUBDISTRICTS.iter().map(|s| s.to_string()).collect(),
            aliases: VENDOR_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            max_attempts: 3,
            courtesy_delay: Duration::from_secs(1),
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
            output_dir: PathBuf::from("output"),
            db_file_name: "maharashtra_weather.duckdb".to_string(),
            table_name: "weather_data".to_string(),
        }
    }

    /// Build the config from environment variables.  Call `dotenvy` first if
    /// the variables live in an `.env` file.
    ///  - `OPENWEATHER_API_KEY` (required)
    ///  - `WEATHER_ETL_OUTPUT_DIR`
    ///  - `WEATHER_ETL_LOCATIONS`, path to a [`LocationSet`] json file
    pub fn from_env() -> Result<EtlConfig, ConfigError> {
        let api_key = env::var("OPENWEATHER_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENWEATHER_API_KEY"))?;
        let mut config = EtlConfig::new(api_key);
        if let Ok(dir) = env::var("WEATHER_ETL_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("WEATHER_ETL_LOCATIONS") {
            let locations = LocationSet::from_path(Path::new(&path))?;
            config = config.with_locations(locations);
        }
        Ok(config)
    }

    /// Replace the location lists.  Aliases are only replaced if the set
    /// provides its own.
    pub fn with_locations(mut self, locations: LocationSet) -> EtlConfig {
        self.districts = locations.districts;
        self.sub_districts = locations.sub_districts;
        if let Some(parent) = locations.parent_district {
            self.parent_district = parent;
        }
        if let Some(aliases) = locations.aliases {
            self.aliases = aliases;
        }
        self
    }

    /// Path of the DuckDB file the rows get appended to.
    pub fn duckdb_path(&self) -> PathBuf {
        self.output_dir.join(&self.db_file_name)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config() {
        let config = EtlConfig::new("secret");
        assert_eq!(config.districts.len(), 32);
        assert_eq!(config.sub_districts.len(), 14);
        assert_eq!(config.aliases["Raigad"], "Alibag,Maharashtra,IN");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(
            config.duckdb_path(),
            PathBuf::from("output/maharashtra_weather.duckdb")
        );
    }

    #[test]
    fn read_location_set() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"districts": ["Pune", "Satara"], "sub_districts": ["Mulshi"], "parent_district": "Pune"}}"#
        )?;
        let locations = LocationSet::from_path(file.path())?;
        let config = EtlConfig::new("secret").with_locations(locations);
        assert_eq!(config.districts, vec!["Pune", "Satara"]);
        assert_eq!(config.sub_districts, vec!["Mulshi"]);
        assert_eq!(config.parent_district, "Pune");
        // aliases are kept when the file has none
        assert_eq!(config.aliases.len(), VENDOR_ALIASES.len());
        Ok(())
    }

    #[test]
    fn bad_location_file() {
        let res = LocationSet::from_path(Path::new("/nonexistent/locations.json"));
        assert!(matches!(res, Err(ConfigError::Io { .. })));
    }
}
