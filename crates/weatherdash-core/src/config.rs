//! Construction-time configuration for the analytics engine.

use time::macros::offset;
use time::{Duration, UtcOffset};

/// Default number of records per page when the caller gives no limit.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Settings the engine needs but does not own.
///
/// The location fields label summaries and drive the collector; the UTC
/// offset renders wall-clock times inside alert messages.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub utc_offset: UtcOffset,
    pub default_page_limit: u32,
    /// Length of the trailing window used by insights and default summaries.
    pub window: Duration,
}

impl AnalyticsConfig {
    pub fn new(location: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            location: location.into(),
            latitude,
            longitude,
            ..Self::default()
        }
    }

    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_default_page_limit(mut self, limit: u32) -> Self {
        self.default_page_limit = limit;
        self
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            location: "Recife, Brasil".to_string(),
            latitude: -8.05,
            longitude: -34.9,
            utc_offset: offset!(-3),
            default_page_limit: DEFAULT_PAGE_LIMIT,
            window: Duration::hours(24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.location, "Recife, Brasil");
        assert_eq!(config.utc_offset, offset!(-3));
        assert_eq!(config.default_page_limit, 50);
        assert_eq!(config.window, Duration::hours(24));
    }

    #[test]
    fn test_builder() {
        let config = AnalyticsConfig::new("Lisbon", 38.72, -9.14)
            .with_utc_offset(UtcOffset::UTC)
            .with_default_page_limit(10);
        assert_eq!(config.location, "Lisbon");
        assert_eq!(config.latitude, 38.72);
        assert!(config.utc_offset.is_utc());
        assert_eq!(config.default_page_limit, 10);
    }
}
