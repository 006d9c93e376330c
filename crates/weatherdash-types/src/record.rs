//! Weather-log records as ingested and as read back.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ValidationError, ValidationResult};

/// A stored weather observation.
///
/// Records are immutable once written. The `raw` payload captured at
/// ingestion is never part of this read shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Observation time (not insertion time).
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// City or region label.
    pub location: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Apparent temperature in °C.
    pub feels_like: f64,
    /// Relative humidity, 0-100.
    pub humidity: f64,
    /// Wind speed in km/h.
    pub wind_speed: f64,
    /// Opaque condition label such as `clear` or `rain`.
    pub condition: String,
    /// Probability of rain, 0-1.
    pub rain_probability: f64,
}

/// Ingest payload for a new weather record.
///
/// `feels_like` is optional and falls back to `temperature` when the
/// record is materialized with [`NewWeatherRecord::into_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWeatherRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    pub humidity: f64,
    pub wind_speed: f64,
    pub condition: String,
    pub rain_probability: f64,
    /// Upstream payload kept for audit.
    #[serde(default = "empty_object")]
    pub raw: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl NewWeatherRecord {
    /// Check types and ranges of every field.
    ///
    /// Only structural checks are made here; physically implausible
    /// values (a 70°C reading, say) are accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use weatherdash_types::NewWeatherRecord;
    /// use time::macros::datetime;
    ///
    /// let mut record = NewWeatherRecord {
    ///     timestamp: datetime!(2025-11-30 12:00 UTC),
    ///     location: "Recife, Brasil".to_string(),
    ///     latitude: -8.05,
    ///     longitude: -34.9,
    ///     temperature: 27.5,
    ///     feels_like: None,
    ///     humidity: 70.0,
    ///     wind_speed: 12.0,
    ///     condition: "clear".to_string(),
    ///     rain_probability: 0.1,
    ///     raw: serde_json::json!({}),
    /// };
    /// assert!(record.validate().is_ok());
    ///
    /// record.humidity = 101.0;
    /// assert!(record.validate().is_err());
    /// ```
    pub fn validate(&self) -> ValidationResult<()> {
        if self.location.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "location" });
        }
        if self.condition.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "condition" });
        }

        check_range("latitude", self.latitude, -90.0, 90.0)?;
        check_range("longitude", self.longitude, -180.0, 180.0)?;
        check_finite("temperature", self.temperature)?;
        if let Some(feels_like) = self.feels_like {
            check_finite("feels_like", feels_like)?;
        }
        check_range("humidity", self.humidity, 0.0, 100.0)?;
        check_range("wind_speed", self.wind_speed, 0.0, f64::MAX)?;
        check_range("rain_probability", self.rain_probability, 0.0, 1.0)?;

        Ok(())
    }

    /// Materialize the stored shape, defaulting `feels_like` to `temperature`.
    pub fn into_record(self) -> WeatherRecord {
        WeatherRecord {
            timestamp: self.timestamp,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            temperature: self.temperature,
            feels_like: self.feels_like.unwrap_or(self.temperature),
            humidity: self.humidity,
            wind_speed: self.wind_speed,
            condition: self.condition,
            rain_probability: self.rain_probability,
        }
    }
}

fn check_finite(field: &'static str, value: f64) -> ValidationResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> NewWeatherRecord {
        NewWeatherRecord {
            timestamp: datetime!(2025-11-30 12:00 UTC),
            location: "Recife, Brasil".to_string(),
            latitude: -8.05,
            longitude: -34.9,
            temperature: 27.5,
            feels_like: Some(29.0),
            humidity: 70.0,
            wind_speed: 12.0,
            condition: "partly_cloudy".to_string(),
            rain_probability: 0.3,
            raw: serde_json::json!({ "weather_code": 2 }),
        }
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_feels_like_defaults_to_temperature() {
        let mut new = sample();
        new.feels_like = None;
        let record = new.into_record();
        assert_eq!(record.feels_like, 27.5);
    }

    #[test]
    fn test_feels_like_kept_when_present() {
        let record = sample().into_record();
        assert_eq!(record.feels_like, 29.0);
    }

    #[test]
    fn test_empty_location_rejected() {
        let mut new = sample();
        new.location = "   ".to_string();
        assert_eq!(
            new.validate(),
            Err(ValidationError::EmptyField { field: "location" })
        );
    }

    #[test]
    fn test_empty_condition_rejected() {
        let mut new = sample();
        new.condition = String::new();
        assert!(matches!(
            new.validate(),
            Err(ValidationError::EmptyField { field: "condition" })
        ));
    }

    #[test]
    fn test_humidity_bounds() {
        let mut new = sample();
        new.humidity = 0.0;
        assert!(new.validate().is_ok());
        new.humidity = 100.0;
        assert!(new.validate().is_ok());
        new.humidity = 100.5;
        assert!(matches!(
            new.validate(),
            Err(ValidationError::OutOfRange {
                field: "humidity",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_wind_rejected() {
        let mut new = sample();
        new.wind_speed = -0.1;
        assert!(matches!(
            new.validate(),
            Err(ValidationError::OutOfRange {
                field: "wind_speed",
                ..
            })
        ));
    }

    #[test]
    fn test_rain_probability_is_a_fraction() {
        let mut new = sample();
        new.rain_probability = 45.0;
        assert!(new.validate().is_err());
        new.rain_probability = 1.0;
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_coordinates_bounds() {
        let mut new = sample();
        new.latitude = 91.0;
        assert!(new.validate().is_err());

        let mut new = sample();
        new.longitude = -180.5;
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_nan_temperature_rejected() {
        let mut new = sample();
        new.temperature = f64::NAN;
        assert_eq!(
            new.validate(),
            Err(ValidationError::NotFinite {
                field: "temperature"
            })
        );
    }

    #[test]
    fn test_extreme_temperature_accepted() {
        let mut new = sample();
        new.temperature = 70.0;
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let json = r#"{
            "timestamp": "2025-11-30T12:00:00Z",
            "location": "Recife, PE",
            "latitude": -8.0541,
            "longitude": -34.8811,
            "temperature": 25.5,
            "humidity": 65,
            "wind_speed": 15.5,
            "condition": "clear",
            "rain_probability": 0.3
        }"#;

        let new: NewWeatherRecord = serde_json::from_str(json).unwrap();
        assert_eq!(new.feels_like, None);
        assert!(new.raw.as_object().unwrap().is_empty());
        assert_eq!(new.timestamp, datetime!(2025-11-30 12:00 UTC));
    }

    #[test]
    fn test_record_serializes_without_raw() {
        let record = sample().into_record();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("raw").is_none());
        assert_eq!(json["timestamp"], "2025-11-30T12:00:00Z");
        assert_eq!(json["feels_like"], 29.0);
    }
}
