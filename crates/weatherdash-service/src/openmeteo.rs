//! Open-Meteo client for current conditions and the hourly forecast.
//!
//! Network calls are thin; the response mapping lives in [`parse_current`]
//! and [`parse_forecast`] so it can be exercised without a network.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use weatherdash_core::AnalyticsConfig;
use weatherdash_types::NewWeatherRecord;

/// Per-request timeout for upstream calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of hourly entries returned by [`OpenMeteoClient::forecast`].
pub const FORECAST_HOURS: usize = 24;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code,apparent_temperature,precipitation_probability";
const HOURLY_FIELDS: &str = "precipitation_probability,temperature_2m";

/// Errors talking to Open-Meteo.
#[derive(Debug, thiserror::Error)]
pub enum OpenMeteoError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Response is missing '{0}'")]
    MissingField(&'static str),
    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid time '{0}' in response")]
    InvalidTime(String),
}

/// One hour of forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastHour {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub temperature: f64,
    /// Probability in [0, 1].
    pub precipitation_probability: f64,
}

/// The next hours of forecast for the configured location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub location: String,
    pub hourly: Vec<ForecastHour>,
}

/// HTTP client for the Open-Meteo forecast endpoint.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, params: &[(&str, String)]) -> Result<Value, OpenMeteoError> {
        debug!("GET {} {:?}", self.base_url, params);
        let body = self
            .http
            .get(&self.base_url)
            .query(params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }

    /// Current conditions at the configured location, as an ingestible record.
    pub async fn current(
        &self,
        location: &AnalyticsConfig,
        now: OffsetDateTime,
    ) -> Result<NewWeatherRecord, OpenMeteoError> {
        let body = self
            .get(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("timezone", "GMT".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .await?;
        parse_current(&body, location, now)
    }

    /// The next [`FORECAST_HOURS`] hourly entries starting at the current hour.
    pub async fn forecast(
        &self,
        location: &AnalyticsConfig,
        now: OffsetDateTime,
    ) -> Result<Forecast, OpenMeteoError> {
        let body = self
            .get(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("timezone", "GMT".to_string()),
                ("forecast_days", "2".to_string()),
            ])
            .await?;
        Ok(Forecast {
            location: location.location.clone(),
            hourly: parse_forecast(&body, now)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<i64>,
    precipitation_probability: Option<f64>,
}

/// Map a `current` response onto a record observed at `now`.
///
/// Missing numbers become 0; precipitation arrives in percent and is scaled
/// to [0, 1]. The raw `current` object is kept as the record's payload.
pub fn parse_current(
    body: &Value,
    location: &AnalyticsConfig,
    now: OffsetDateTime,
) -> Result<NewWeatherRecord, OpenMeteoError> {
    let raw = body
        .get("current")
        .ok_or(OpenMeteoError::MissingField("current"))?;
    let current: CurrentConditions = serde_json::from_value(raw.clone())?;

    let temperature = round_to(current.temperature_2m.unwrap_or(0.0), 1);
    let rain = current.precipitation_probability.unwrap_or(0.0) / 100.0;

    Ok(NewWeatherRecord {
        timestamp: now,
        location: location.location.clone(),
        latitude: location.latitude,
        longitude: location.longitude,
        temperature,
        feels_like: Some(
            current
                .apparent_temperature
                .map_or(temperature, |t| round_to(t, 1)),
        ),
        humidity: current.relative_humidity_2m.unwrap_or(0.0).clamp(0.0, 100.0),
        wind_speed: round_to(current.wind_speed_10m.unwrap_or(0.0).max(0.0), 1),
        condition: condition_for_code(current.weather_code.unwrap_or(0)).to_string(),
        rain_probability: round_to(rain, 2).clamp(0.0, 1.0),
        raw: raw.clone(),
    })
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
}

/// Pick the [`FORECAST_HOURS`] entries starting at the whole hour of `now`.
///
/// Times are read as UTC. If no entry is at or after the current hour the
/// series starts from its first entry.
pub fn parse_forecast(
    body: &Value,
    now: OffsetDateTime,
) -> Result<Vec<ForecastHour>, OpenMeteoError> {
    let hourly = body
        .get("hourly")
        .ok_or(OpenMeteoError::MissingField("hourly"))?;
    let series: HourlySeries = serde_json::from_value(hourly.clone())?;

    let times = series
        .time
        .iter()
        .map(String::as_str)
        .map(parse_hour)
        .collect::<Result<Vec<_>, _>>()?;

    let current_hour = now
        .to_offset(time::UtcOffset::UTC)
        .replace_minute(0)
        .and_then(|t| t.replace_second(0))
        .and_then(|t| t.replace_nanosecond(0))
        .map_err(|_| OpenMeteoError::InvalidTime(now.to_string()))?;

    let start = times.iter().position(|t| *t >= current_hour).unwrap_or(0);

    Ok(times
        .iter()
        .enumerate()
        .skip(start)
        .take(FORECAST_HOURS)
        .map(|(i, timestamp)| ForecastHour {
            timestamp: *timestamp,
            temperature: series.temperature_2m.get(i).copied().flatten().unwrap_or(0.0),
            precipitation_probability: series
                .precipitation_probability
                .get(i)
                .copied()
                .flatten()
                .map_or(0.0, |p| p / 100.0),
        })
        .collect())
}

fn parse_hour(text: &str) -> Result<OffsetDateTime, OpenMeteoError> {
    PrimitiveDateTime::parse(text, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| OpenMeteoError::InvalidTime(text.to_string()))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Condition label for a WMO weather interpretation code.
pub fn condition_for_code(code: i64) -> &'static str {
    match code {
        0 | 1 => "clear",
        2 => "partly_cloudy",
        3 => "cloudy",
        4 => "smoky",
        5 => "haze",
        45 | 48 => "foggy",
        51..=55 => "drizzle",
        56 | 57 => "freezing_drizzle",
        61..=65 => "rain",
        66 | 67 => "freezing_rain",
        68 | 69 => "rain_and_drizzle",
        71..=75 => "snow",
        77 => "snow_grains",
        80..=82 => "rain_shower",
        83 | 84 => "snow_rain_shower",
        85 | 86 => "snow_shower",
        87 | 88 => "snow_grains_shower",
        95..=99 => "thunderstorm",
        _ => "unknown",
    }
}
