// Current weather from OpenWeatherMap.
// https://openweathermap.org/current

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::EtlConfig;
use crate::error::FetchError;

/// Anything that can answer a vendor query with the current weather.
/// Closures `Fn(&str) -> Result<CurrentWeather, FetchError>` qualify too.
pub trait WeatherSource {
    fn fetch(&self, query: &str) -> Result<CurrentWeather, FetchError>;
}

impl<F> WeatherSource for F
where
    F: Fn(&str) -> Result<CurrentWeather, FetchError>,
{
    fn fetch(&self, query: &str) -> Result<CurrentWeather, FetchError> {
        self(query)
    }
}

/// The subset of the response we use.  Every section is optional, missing
/// values end up as nulls downstream.
#[derive(Debug, Default, Deserialize)]
pub struct CurrentWeather {
    pub main: Option<Main>,
    pub weather: Option<Vec<Condition>>,
    pub wind: Option<Wind>,
    pub clouds: Option<Clouds>,
    pub sys: Option<Sys>,
    pub coord: Option<Coord>,
    /// Shift in seconds from UTC
    pub timezone: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Main {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Condition {
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Clouds {
    pub all: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Sys {
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Coord {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(config: &EtlConfig) -> Result<OpenWeatherClient, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(OpenWeatherClient {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

impl WeatherSource for OpenWeatherClient {
    fn fetch(&self, query: &str) -> Result<CurrentWeather, FetchError> {
        // the url carries the api key, keep it out of the error messages
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .map_err(|e| FetchError::Transport(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                query: query.to_string(),
            });
        }
        let body = response
            .text()
            .map_err(|e| FetchError::Transport(e.without_url()))?;
        Ok(serde_json::from_str(&body)?)
    }
}
