use std::fmt::Display;

use jiff::civil::{DateTime, Time};
use serde::{Serialize, Serializer};

use super::extract::WeatherRecord;

pub const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ComfortLevel {
    Unknown,
    Cool,
    #[serde(rename = "Very Hot")]
    VeryHot,
    Humid,
    Comfortable,
    Moderate,
}

impl ComfortLevel {
    /// Rules are checked in order, the first one that matches wins.
    pub fn from_observation(temperature: Option<f64>, humidity: Option<f64>) -> ComfortLevel {
        let (t, h) = match (temperature, humidity) {
            (Some(t), Some(h)) if !t.is_nan() && !h.is_nan() => (t, h),
            _ => return ComfortLevel::Unknown,
        };
        if t < 20.0 {
            ComfortLevel::Cool
        } else if t > 35.0 {
            ComfortLevel::VeryHot
        } else if h > 80.0 {
            ComfortLevel::Humid
        } else if (20.0..=28.0).contains(&t) && (40.0..=60.0).contains(&h) {
            ComfortLevel::Comfortable
        } else {
            ComfortLevel::Moderate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComfortLevel::Unknown => UNKNOWN,
            ComfortLevel::Cool => "Cool",
            ComfortLevel::VeryHot => "Very Hot",
            ComfortLevel::Humid => "Humid",
            ComfortLevel::Comfortable => "Comfortable",
            ComfortLevel::Moderate => "Moderate",
        }
    }
}

impl Display for ComfortLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 16-point compass label for a direction in degrees, North is 0.
/// Halfway cases go to the even sector.
pub fn compass_point(degrees: Option<f64>) -> &'static str {
    match degrees {
        Some(deg) if deg.is_finite() => {
            let index = (deg / 22.5).round_ties_even() as i64;
            COMPASS_POINTS[index.rem_euclid(16) as usize]
        }
        _ => UNKNOWN,
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    round2(celsius * 9.0 / 5.0 + 32.0)
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Drop non-finite values and round to 2 decimals.
fn normalize(x: Option<f64>) -> Option<f64> {
    x.filter(|v| v.is_finite()).map(round2)
}

/// Upper case the first letter of each word, lower case the rest.  A word
/// starts after any character that is not a letter.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// One row of the output table.  Field order is the column order of the
/// CSV file and of the DuckDB table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRow {
    pub location_name: String,
    pub district: String,
    pub sub_district: String,
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
    #[serde(serialize_with = "serialize_datetime")]
    pub timestamp: DateTime,
    #[serde(serialize_with = "serialize_time")]
    pub sunrise: Option<Time>,
    #[serde(serialize_with = "serialize_time")]
    pub sunset: Option<Time>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub error: Option<String>,
    pub temperature_fahrenheit: Option<f64>,
    pub comfort_level: ComfortLevel,
    pub wind_direction_desc: &'static str,
}

impl WeatherRow {
    pub fn timestamp_str(&self) -> String {
        self.timestamp.strftime("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn sunrise_str(&self) -> Option<String> {
        self.sunrise.map(format_time)
    }

    pub fn sunset_str(&self) -> Option<String> {
        self.sunset.map(format_time)
    }
}

impl From<WeatherRecord> for WeatherRow {
    fn from(record: WeatherRecord) -> Self {
        let m = record.measurements;
        let temperature = normalize(m.temperature);
        WeatherRow {
            location_name: record.location_name,
            district: record.district,
            sub_district: record.sub_district,
            temperature,
            feels_like: normalize(m.feels_like),
            min_temp: normalize(m.min_temp),
            max_temp: normalize(m.max_temp),
            humidity: m.humidity,
            pressure: m.pressure,
            weather_desc: m.weather_desc.as_deref().map(title_case),
            wind_speed: normalize(m.wind_speed),
            wind_direction: m.wind_direction,
            cloudiness: m.cloudiness,
            timestamp: record.timestamp,
            sunrise: m.sunrise,
            sunset: m.sunset,
            latitude: normalize(m.latitude),
            longitude: normalize(m.longitude),
            error: record.error,
            temperature_fahrenheit: temperature.map(celsius_to_fahrenheit),
            comfort_level: ComfortLevel::from_observation(temperature, m.humidity),
            wind_direction_desc: compass_point(m.wind_direction),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherTable {
    pub rows: Vec<WeatherRow>,
}

impl WeatherTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeatherRow> {
        self.rows.iter()
    }
}

/// Normalize the records and add the derived columns.  Return `None` if
/// there is nothing to transform.  No record is ever dropped.
pub fn transform(records: Vec<WeatherRecord>) -> Option<WeatherTable> {
    if records.is_empty() {
        return None;
    }
    Some(WeatherTable {
        rows: records.into_iter().map(WeatherRow::from).collect(),
    })
}

fn format_time(t: Time) -> String {
    t.strftime("%H:%M:%S").to_string()
}

fn serialize_time<S: Serializer>(t: &Option<Time>, serializer: S) -> Result<S::Ok, S::Error> {
    match t {
        Some(t) => serializer.serialize_str(&format_time(*t)),
        None => serializer.serialize_none(),
    }
}

fn serialize_datetime<S: Serializer>(dt: &DateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&dt.strftime("%Y-%m-%d %H:%M:%S").to_string())
}
