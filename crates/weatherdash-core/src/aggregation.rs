//! In-memory statistics over a slice of records.
//!
//! The store computes range summaries in SQL; these helpers cover windows
//! that are already loaded, such as the insights window.

use weatherdash_types::{MetricStats, WeatherRecord};

/// A numeric field of [`WeatherRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Humidity,
    WindSpeed,
    RainProbability,
}

impl Metric {
    pub fn value(self, record: &WeatherRecord) -> f64 {
        match self {
            Metric::Temperature => record.temperature,
            Metric::Humidity => record.humidity,
            Metric::WindSpeed => record.wind_speed,
            Metric::RainProbability => record.rain_probability,
        }
    }
}

/// Min, max and unrounded mean of one metric; zero-filled when empty.
pub fn metric_stats(records: &[WeatherRecord], metric: Metric) -> MetricStats {
    MetricStats::from_values(records.iter().map(|r| metric.value(r)))
}

/// Round half up, the way alert messages present numbers.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
