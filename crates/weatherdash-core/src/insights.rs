//! Rule-based alerts over the trailing observation window.
//!
//! Evaluation runs in three stages:
//!
//! 1. Every rule in [`CRITICAL_RULES`] is applied in order; each may add
//!    one alert. Despite the name, some of these rules only produce `info`
//!    alerts (high humidity, cold context, moderate rain).
//! 2. When nothing volatile turned up, the [`NORMAL_RULES`] backfill
//!    context about calm conditions until [`MAX_ALERTS`] is reached. If the
//!    list is still empty, a generic summary alert is added.
//! 3. Alerts are stably sorted by severity. Every warning and danger alert
//!    is kept; info alerts only fill what is left of [`MAX_ALERTS`].

use serde::Serialize;
use time::UtcOffset;

use weatherdash_types::{Alert, AlertKind, InsightStatus, MetricStats, WeatherRecord};

use crate::aggregation::{Metric, metric_stats, round_half_up};

/// Number of alerts the final list is trimmed to, unless more are critical.
pub const MAX_ALERTS: usize = 3;

/// Rain probability at which an alert is raised.
pub const RAIN_ALERT_THRESHOLD: f64 = 0.6;
/// Rain probability at which the rain alert becomes a warning.
pub const RAIN_WARNING_THRESHOLD: f64 = 0.8;
/// Max minus min temperature (°C) counted as a significant swing.
pub const TEMP_SWING_THRESHOLD: f64 = 6.0;
/// Average relative humidity (%) considered high.
pub const HIGH_HUMIDITY_THRESHOLD: f64 = 75.0;
/// Peak wind speed (km/h) considered strong.
pub const STRONG_WIND_THRESHOLD: f64 = 30.0;
/// Peak temperature (°C) considered extreme heat.
pub const EXTREME_HEAT_THRESHOLD: f64 = 35.0;

/// Insights for one window: the final alerts and their overall severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub alerts: Vec<Alert>,
    pub status: InsightStatus,
}

impl Insights {
    /// Result for a window without records.
    pub fn empty() -> Self {
        Self {
            alerts: Vec::new(),
            status: InsightStatus::Info,
        }
    }
}

/// Aggregates every rule reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub temperature: MetricStats,
    pub humidity: MetricStats,
    pub wind_speed: MetricStats,
    pub rain_probability: MetricStats,
}

impl WindowStats {
    pub fn from_records(records: &[WeatherRecord]) -> Self {
        Self {
            temperature: metric_stats(records, Metric::Temperature),
            humidity: metric_stats(records, Metric::Humidity),
            wind_speed: metric_stats(records, Metric::WindSpeed),
            rain_probability: metric_stats(records, Metric::RainProbability),
        }
    }

    pub fn temp_variation(&self) -> f64 {
        self.temperature.spread()
    }
}

/// The records and statistics a rule is evaluated against.
pub struct Window<'a> {
    /// Records in ascending timestamp order.
    pub records: &'a [WeatherRecord],
    pub stats: WindowStats,
    /// Offset used to print local times.
    pub utc_offset: UtcOffset,
}

/// A single alert rule.
pub type Rule = fn(&Window<'_>) -> Option<Alert>;

/// Rules for conditions worth reporting, in evaluation order.
pub const CRITICAL_RULES: &[Rule] = &[
    rain_peak,
    temperature_swing,
    high_humidity,
    strong_wind,
    extreme_heat,
    cold_context,
];

/// Rules describing calm conditions, in evaluation order.
pub const NORMAL_RULES: &[Rule] = &[
    stable_temperature,
    comfortable_humidity,
    normal_wind,
    low_rain,
];

/// Evaluate the alert rules over `records`, which must be sorted by
/// ascending timestamp.
pub fn evaluate(records: &[WeatherRecord], utc_offset: UtcOffset) -> Insights {
    if records.is_empty() {
        return Insights::empty();
    }

    let window = Window {
        records,
        stats: WindowStats::from_records(records),
        utc_offset,
    };

    let mut alerts: Vec<Alert> = CRITICAL_RULES
        .iter()
        .filter_map(|rule| rule(&window))
        .collect();

    let has_critical = alerts.iter().any(|alert| alert.kind.is_critical());
    if alerts.is_empty() || (!has_critical && alerts.len() < MAX_ALERTS) {
        for rule in NORMAL_RULES {
            if alerts.len() >= MAX_ALERTS {
                break;
            }
            if let Some(alert) = rule(&window) {
                alerts.push(alert);
            }
        }

        if alerts.is_empty() {
            alerts.push(window_summary(&window));
        }
    }

    finalize(alerts)
}

/// Sort by severity and cap the info alerts.
pub fn finalize(mut alerts: Vec<Alert>) -> Insights {
    // sort_by_key is stable, so equal severities keep rule order
    alerts.sort_by_key(|alert| std::cmp::Reverse(alert.kind.priority()));

    let (critical, info): (Vec<Alert>, Vec<Alert>) =
        alerts.into_iter().partition(|alert| alert.kind.is_critical());

    let info_slots = MAX_ALERTS.saturating_sub(critical.len());
    let mut alerts = critical;
    alerts.extend(info.into_iter().take(info_slots));

    let status = InsightStatus::from_alerts(&alerts);
    Insights { alerts, status }
}

/// The first record holding the highest rain probability.
fn peak_rain_record(records: &[WeatherRecord]) -> Option<&WeatherRecord> {
    records.iter().fold(None, |peak: Option<&WeatherRecord>, record| match peak {
        Some(best) if record.rain_probability <= best.rain_probability => Some(best),
        _ => Some(record),
    })
}

fn local_time(record: &WeatherRecord, offset: UtcOffset) -> String {
    let local = record.timestamp.to_offset(offset);
    format!("{:02}:{:02}", local.hour(), local.minute())
}

fn rain_peak(window: &Window<'_>) -> Option<Alert> {
    let max = window.stats.rain_probability.max;
    if max < RAIN_ALERT_THRESHOLD {
        return None;
    }
    let peak = peak_rain_record(window.records)?;

    let mut message = format!(
        "High chance of rain ({}%) expected around {}.",
        round_half_up(peak.rain_probability * 100.0),
        local_time(peak, window.utc_offset)
    );
    if window.stats.humidity.avg > HIGH_HUMIDITY_THRESHOLD {
        message.push_str(" Humidity levels are above average for this time of day.");
    }

    let kind = if max >= RAIN_WARNING_THRESHOLD {
        AlertKind::Warning
    } else {
        AlertKind::Info
    };
    Some(Alert { kind, message })
}

fn temperature_swing(window: &Window<'_>) -> Option<Alert> {
    let temp = window.stats.temperature;
    let variation = window.stats.temp_variation();
    (variation > TEMP_SWING_THRESHOLD).then(|| {
        Alert::warning(format!(
            "Significant temperature swing over the last 24 hours ({}°C to {}°C, a difference of {}°C).",
            round_half_up(temp.min),
            round_half_up(temp.max),
            round_half_up(variation)
        ))
    })
}

fn high_humidity(window: &Window<'_>) -> Option<Alert> {
    let avg = window.stats.humidity.avg;
    (avg > HIGH_HUMIDITY_THRESHOLD).then(|| {
        Alert::info(format!(
            "High average humidity ({}%) over the last 24 hours. It may feel muggier than usual.",
            round_half_up(avg)
        ))
    })
}

fn strong_wind(window: &Window<'_>) -> Option<Alert> {
    let max = window.stats.wind_speed.max;
    (max > STRONG_WIND_THRESHOLD).then(|| {
        Alert::warning(format!(
            "Strong wind detected (up to {} km/h) over the last 24 hours.",
            round_half_up(max)
        ))
    })
}

fn extreme_heat(window: &Window<'_>) -> Option<Alert> {
    let max = window.stats.temperature.max;
    (max > EXTREME_HEAT_THRESHOLD).then(|| {
        Alert::danger(format!(
            "Very high temperature recorded ({}°C). Take precautions against heatstroke and dehydration.",
            round_half_up(max)
        ))
    })
}

fn cold_context(window: &Window<'_>) -> Option<Alert> {
    let temp = window.stats.temperature;
    (temp.min < 18.0 && temp.avg < 20.0).then(|| {
        Alert::info(format!(
            "Lower temperatures recorded (minimum of {}°C).",
            round_half_up(temp.min)
        ))
    })
}

fn stable_temperature(window: &Window<'_>) -> Option<Alert> {
    let avg = window.stats.temperature.avg;
    ((20.0..=30.0).contains(&avg) && window.stats.temp_variation() <= TEMP_SWING_THRESHOLD).then(
        || {
            Alert::info(format!(
                "Stable average temperature over the last 24 hours ({}°C). Conditions are within the normal range.",
                round_half_up(avg)
            ))
        },
    )
}

fn comfortable_humidity(window: &Window<'_>) -> Option<Alert> {
    let avg = window.stats.humidity.avg;
    (40.0..=70.0).contains(&avg).then(|| {
        Alert::info(format!(
            "Average humidity at comfortable levels ({}%).",
            round_half_up(avg)
        ))
    })
}

fn normal_wind(window: &Window<'_>) -> Option<Alert> {
    let wind = window.stats.wind_speed;
    ((5.0..=20.0).contains(&wind.avg) && wind.max <= STRONG_WIND_THRESHOLD).then(|| {
        Alert::info(format!(
            "Wind within normal conditions (average of {} km/h).",
            round_half_up(wind.avg)
        ))
    })
}

fn low_rain(window: &Window<'_>) -> Option<Alert> {
    let rain = window.stats.rain_probability;
    (rain.max < 0.3 && rain.avg < 0.2).then(|| {
        Alert::info("Low chance of rain over the last 24 hours. Dry conditions prevail.")
    })
}

fn window_summary(window: &Window<'_>) -> Alert {
    let stats = &window.stats;
    Alert::info(format!(
        "Last 24 hours: average temperature of {}°C, humidity of {}% and average wind of {} km/h.",
        round_half_up(stats.temperature.avg),
        round_half_up(stats.humidity.avg),
        round_half_up(stats.wind_speed.avg)
    ))
}
