use std::thread;

use jiff::civil::{DateTime, Time};
use jiff::tz::{Offset, TimeZone};
use jiff::{Timestamp, Zoned};
use log::{error, info, warn};

use super::client::{CurrentWeather, WeatherSource};
use crate::config::EtlConfig;
use crate::error::FetchError;
use crate::locations::Location;

/// Measured values for one location.  All `None` for a placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements {
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub weather_desc: Option<String>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloudiness: Option<f64>,
    pub sunrise: Option<Time>,
    pub sunset: Option<Time>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub location_name: String,
    pub district: String,
    pub sub_district: String,
    pub measurements: Measurements,
    /// Local wall-clock time the record was emitted
    pub timestamp: DateTime,
    pub error: Option<String>,
}

impl WeatherRecord {
    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}

/// Progress of a single location through its attempts.
#[derive(Debug)]
enum FetchState {
    Pending { attempt: u32 },
    Retrying { attempt: u32, error: FetchError },
    Succeeded(Measurements),
    Exhausted(FetchError),
}

pub struct Extractor<'a, S: WeatherSource> {
    config: &'a EtlConfig,
    source: &'a S,
}

impl<'a, S: WeatherSource> Extractor<'a, S> {
    pub fn new(config: &'a EtlConfig, source: &'a S) -> Self {
        Extractor { config, source }
    }

    /// Return one record per location, in the same order.  Failures never
    /// escape, a location that exhausts its attempts gets a placeholder.
    pub fn extract(&self, locations: &[String]) -> Vec<WeatherRecord> {
        let mut records = Vec::with_capacity(locations.len());
        let mut failed: Vec<&str> = Vec::new();
        for name in locations {
            let record = self.extract_one(&Location::classify(name, self.config));
            if record.is_placeholder() {
                failed.push(name);
            }
            records.push(record);
        }

        if !failed.is_empty() {
            error!("Failed to fetch data for the following locations:");
            for name in &failed {
                error!("- {}", name);
            }
            error!("Total failed locations: {}", failed.len());
        }
        records
    }

    fn extract_one(&self, location: &Location) -> WeatherRecord {
        let query = location.vendor_query(self.config);
        let mut state = FetchState::Pending { attempt: 1 };
        loop {
            state = match state {
                FetchState::Pending { attempt } => self.attempt(&query, attempt),
                FetchState::Retrying { attempt, error } => {
                    warn!(
                        "Error fetching data for {} with query '{}' (attempt {}/{}): {}",
                        location.name,
                        query,
                        attempt,
                        self.max_attempts(),
                        error
                    );
                    thread::sleep(self.config.retry_delay);
                    FetchState::Pending {
                        attempt: attempt + 1,
                    }
                }
                FetchState::Succeeded(measurements) => {
                    info!("Successfully extracted data for {}", location.name);
                    return self.emit(location, measurements, None);
                }
                FetchState::Exhausted(error) => {
                    error!(
                        "Error fetching data for {} (attempt {}/{}): {}",
                        location.name,
                        self.max_attempts(),
                        self.max_attempts(),
                        error
                    );
                    return self.emit(location, Measurements::default(), Some(error.to_string()));
                }
            };
        }
    }

    fn attempt(&self, query: &str, attempt: u32) -> FetchState {
        thread::sleep(self.config.courtesy_delay);
        let result = self
            .source
            .fetch(query)
            .and_then(|weather| measurements(&weather));
        match result {
            Ok(m) => FetchState::Succeeded(m),
            Err(error) if attempt >= self.max_attempts() => FetchState::Exhausted(error),
            Err(error) => FetchState::Retrying { attempt, error },
        }
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// The timestamp is taken here, not when the request went out.
    fn emit(
        &self,
        location: &Location,
        measurements: Measurements,
        error: Option<String>,
    ) -> WeatherRecord {
        let (district, sub_district) = location.identity(self.config);
        WeatherRecord {
            location_name: location.name.clone(),
            district,
            sub_district,
            measurements,
            timestamp: Zoned::now().datetime(),
            error,
        }
    }
}

fn measurements(weather: &CurrentWeather) -> Result<Measurements, FetchError> {
    let main = weather.main.as_ref();
    let wind = weather.wind.as_ref();
    let sys = weather.sys.as_ref();
    let coord = weather.coord.as_ref();
    let sunrise = match sys.and_then(|s| s.sunrise) {
        Some(epoch) => Some(local_time(epoch, weather.timezone)?),
        None => None,
    };
    let sunset = match sys.and_then(|s| s.sunset) {
        Some(epoch) => Some(local_time(epoch, weather.timezone)?),
        None => None,
    };
    Ok(Measurements {
        temperature: main.and_then(|m| m.temp),
        feels_like: main.and_then(|m| m.feels_like),
        min_temp: main.and_then(|m| m.temp_min),
        max_temp: main.and_then(|m| m.temp_max),
        humidity: main.and_then(|m| m.humidity),
        pressure: main.and_then(|m| m.pressure),
        weather_desc: weather
            .weather
            .as_ref()
            .and_then(|xs| xs.first())
            .and_then(|c| c.description.clone()),
        wind_speed: wind.and_then(|w| w.speed),
        wind_direction: wind.and_then(|w| w.deg),
        cloudiness: weather.clouds.as_ref().and_then(|c| c.all),
        sunrise,
        sunset,
        latitude: coord.and_then(|c| c.lat),
        longitude: coord.and_then(|c| c.lon),
    })
}

/// Time of day at the location for an epoch in seconds.  Use the offset
/// from the response if there is one, else the local time zone.
fn local_time(epoch: i64, offset_seconds: Option<i32>) -> Result<Time, jiff::Error> {
    let ts = Timestamp::from_second(epoch)?;
    let tz = match offset_seconds {
        Some(seconds) => TimeZone::fixed(Offset::from_seconds(seconds)?),
        None => TimeZone::system(),
    };
    Ok(ts.to_zoned(tz).time())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::error::Error;
    use std::time::{Duration, Instant};

    use jiff::civil::time;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;

    fn test_config() -> EtlConfig {
        let mut config = EtlConfig::new("key");
        config.courtesy_delay = Duration::ZERO;
        config.retry_delay = Duration::ZERO;
        config
    }

    fn pune() -> CurrentWeather {
        serde_json::from_value(json!({
            "main": {"temp": 25.0, "humidity": 50, "pressure": 1012},
            "weather": [{"description": "clear sky"}],
            "wind": {"speed": 3.1, "deg": 90},
            "sys": {"sunrise": 1718410711, "sunset": 1718458215},
            "timezone": 19800
        }))
        .unwrap()
    }

    fn unavailable(query: &str) -> FetchError {
        FetchError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            query: query.to_string(),
        }
    }

    #[test]
    fn one_record_per_location() {
        let config = test_config();
        let source = |query: &str| -> Result<CurrentWeather, FetchError> {
            if query.starts_with("Pune") {
                Ok(pune())
            } else {
                Err(unavailable(query))
            }
        };
        let locations: Vec<String> = vec!["Pune".into(), "Sinnar".into(), "Akola".into()];
        let records = Extractor::new(&config, &source).extract(&locations);
        assert_eq!(records.len(), 3);
        let names: Vec<_> = records.iter().map(|r| r.location_name.as_str()).collect();
        assert_eq!(names, vec!["Pune", "Sinnar", "Akola"]);
        assert!(records[0].error.is_none());
        assert!(records[1].is_placeholder());
        assert!(records[2].is_placeholder());

        assert_eq!(records[1].district, "Nashik");
        assert_eq!(records[1].sub_district, "Sinnar");
        assert_eq!(records[2].district, "Akola");
        assert_eq!(records[2].sub_district, "N/A");
        assert_eq!(records[1].measurements, Measurements::default());
    }

    #[test]
    fn success_after_failures() {
        let config = test_config();
        let calls = RefCell::new(0);
        let source = |query: &str| -> Result<CurrentWeather, FetchError> {
            *calls.borrow_mut() += 1;
            if *calls.borrow() < 3 {
                Err(unavailable(query))
            } else {
                Ok(pune())
            }
        };
        let records = Extractor::new(&config, &source).extract(&["Pune".to_string()]);
        assert_eq!(*calls.borrow(), 3);
        assert_eq!(records[0].error, None);
        assert_eq!(records[0].measurements.temperature, Some(25.0));
    }

    #[test]
    fn placeholder_keeps_last_error() {
        let config = test_config();
        let statuses = [
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ];
        let queries = RefCell::new(Vec::new());
        let source = |query: &str| -> Result<CurrentWeather, FetchError> {
            queries.borrow_mut().push(query.to_string());
            Err(FetchError::Status {
                status: statuses[queries.borrow().len() - 1],
                query: query.to_string(),
            })
        };
        let records = Extractor::new(&config, &source).extract(&["Trimbakeshwar".to_string()]);
        assert_eq!(queries.borrow().len(), 3);
        assert!(queries.borrow().iter().all(|q| q == "Trimbak,Maharashtra,IN"));
        assert_eq!(
            records[0].error.as_deref(),
            Some("504 Gateway Timeout for query 'Trimbak,Maharashtra,IN'")
        );
    }

    #[test]
    fn waits_between_attempts() {
        let mut config = test_config();
        config.courtesy_delay = Duration::from_millis(10);
        config.retry_delay = Duration::from_millis(60);
        let calls = RefCell::new(Vec::<Instant>::new());
        let source = |query: &str| -> Result<CurrentWeather, FetchError> {
            calls.borrow_mut().push(Instant::now());
            Err(unavailable(query))
        };

        let start = Instant::now();
        let records = Extractor::new(&config, &source).extract(&["Beed".to_string()]);
        let end = Instant::now();
        assert!(records[0].is_placeholder());

        let c = config.courtesy_delay;
        let r = config.retry_delay;
        let calls = calls.borrow();
        assert_eq!(calls.len(), 3);
        // courtesy wait before every request, backoff only between failures
        assert!(calls[0].duration_since(start) >= c);
        for pair in calls.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= r + c);
        }
        assert!(end.duration_since(start) >= 3 * c + 2 * r);
        assert!(end.duration_since(calls[2]) < r);
    }

    #[test]
    fn malformed_payload_is_retried() {
        let config = test_config();
        let calls = RefCell::new(HashMap::<String, u32>::new());
        let source = |query: &str| -> Result<CurrentWeather, FetchError> {
            *calls.borrow_mut().entry(query.to_string()).or_default() += 1;
            Err(serde_json::from_str::<CurrentWeather>("not json")
                .unwrap_err()
                .into())
        };
        let records = Extractor::new(&config, &source).extract(&["Latur".to_string()]);
        assert_eq!(calls.borrow()["Latur,Maharashtra,IN"], 3);
        assert!(records[0]
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("invalid response body")));
    }

    #[test]
    fn sunrise_in_location_time() -> Result<(), Box<dyn Error>> {
        let m = measurements(&pune())?;
        // 1718410711 is 2024-06-15T00:18:31Z, +05:30 in India
        assert_eq!(m.sunrise, Some(time(5, 48, 31, 0)));
        assert_eq!(m.sunset, Some(time(19, 0, 15, 0)));
        assert_eq!(m.wind_direction, Some(90.0));
        assert_eq!(m.cloudiness, None);
        assert_eq!(m.weather_desc.as_deref(), Some("clear sky"));
        Ok(())
    }

    #[test]
    fn empty_response_gives_nulls() -> Result<(), Box<dyn Error>> {
        let m = measurements(&CurrentWeather::default())?;
        assert_eq!(m, Measurements::default());
        Ok(())
    }
}
