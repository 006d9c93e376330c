//! Aggregate and timeseries shapes.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Minimum, maximum and arithmetic mean of one metric.
///
/// An empty record set is represented by the zero triple rather than an
/// absent value, so downstream arithmetic stays total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl MetricStats {
    pub const ZERO: MetricStats = MetricStats {
        min: 0.0,
        max: 0.0,
        avg: 0.0,
    };

    /// Fold a sequence of values. Returns [`MetricStats::ZERO`] when empty.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0u64;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }

        if count == 0 {
            return Self::ZERO;
        }

        Self {
            min,
            max,
            avg: sum / count as f64,
        }
    }

    /// `max - min`.
    pub fn spread(&self) -> f64 {
        self.max - self.min
    }
}

/// Per-metric statistics for a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub temperature: MetricStats,
    pub humidity: MetricStats,
    pub wind_speed: MetricStats,
    pub count: u64,
}

impl SummaryStats {
    pub const EMPTY: SummaryStats = SummaryStats {
        temperature: MetricStats::ZERO,
        humidity: MetricStats::ZERO,
        wind_speed: MetricStats::ZERO,
        count: 0,
    };
}

/// A chart point, read chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub temperature: f64,
    pub humidity: f64,
}
