//! The analytics facade: every read and write the transport layer needs.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use weatherdash_store::Store;
use weatherdash_types::{
    MetricStats, NewWeatherRecord, Page, Pagination, TimeRange, TimeseriesPoint, WeatherRecord,
};

use crate::clock::{Clock, SystemClock};
use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::export::{self, ExportFile, ExportFormat, ExportRow};
use crate::insights::{self, Insights};

/// Summary statistics over a time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub location: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub to: Option<OffsetDateTime>,
    pub temperature: MetricStats,
    pub humidity: MetricStats,
    pub wind_speed: MetricStats,
    pub records_count: u64,
}

/// Chronological chart data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeseries {
    pub points: Vec<TimeseriesPoint>,
}

/// Stateless analytics over a [`Store`].
///
/// Holds only configuration and a clock; every call queries the store
/// afresh, so concurrent callers never observe each other.
pub struct WeatherAnalytics {
    config: AnalyticsConfig,
    clock: Arc<dyn Clock>,
}

impl WeatherAnalytics {
    /// Analytics driven by the system clock.
    pub fn new(config: AnalyticsConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AnalyticsConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// The configured trailing window ending now.
    pub fn trailing_window(&self) -> TimeRange {
        TimeRange::trailing(self.now(), self.config.window)
    }

    /// Validate and append a record.
    pub fn ingest(&self, store: &Store, record: NewWeatherRecord) -> Result<WeatherRecord> {
        record.validate()?;
        Ok(store.insert(record)?)
    }

    /// The record with the latest observation time.
    pub fn last_record(&self, store: &Store) -> Result<WeatherRecord> {
        store.find_most_recent()?.ok_or(Error::NotFound)
    }

    /// A page of records in `range`, newest first.
    ///
    /// `page` defaults to 1 and `limit` to the configured page size.
    pub fn list_records(
        &self,
        store: &Store,
        range: &TimeRange,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<WeatherRecord>> {
        let pagination = Pagination::new(
            page.unwrap_or(1),
            limit.unwrap_or(self.config.default_page_limit),
        )?;
        range.validate()?;

        let (records, total) = store.find_range(range, pagination.page(), pagination.limit())?;
        debug!(
            "Listed {} of {} records (page {}, limit {})",
            records.len(),
            total,
            pagination.page(),
            pagination.limit()
        );
        Ok(Page::new(records, pagination, total))
    }

    /// Min/max/avg per metric over `range`.
    ///
    /// A range with neither bound means the trailing window ending now.
    pub fn summary(&self, store: &Store, range: &TimeRange) -> Result<Summary> {
        let range = if range.is_unbounded() {
            self.trailing_window()
        } else {
            *range
        };
        range.validate()?;

        let stats = store.aggregate(&range)?;
        Ok(Summary {
            location: self.config.location.clone(),
            from: range.from,
            to: range.to,
            temperature: stats.temperature,
            humidity: stats.humidity,
            wind_speed: stats.wind_speed,
            records_count: stats.count,
        })
    }

    /// Temperature and humidity over `range`, oldest first.
    pub fn timeseries(&self, store: &Store, range: &TimeRange) -> Result<Timeseries> {
        range.validate()?;
        let points = store.find_timeseries(range)?;
        Ok(Timeseries { points })
    }

    /// Alerts for the trailing window ending now.
    pub fn insights(&self, store: &Store) -> Result<Insights> {
        let to = self.now();
        let from = to - self.config.window;
        let records = store.find_for_window(from, to)?;
        debug!("Evaluating insights over {} records", records.len());
        Ok(insights::evaluate(&records, self.config.utc_offset))
    }

    /// Export-shaped rows over `range`, newest first.
    pub fn export_rows(&self, store: &Store, range: &TimeRange) -> Result<Vec<ExportRow>> {
        range.validate()?;
        let records = store.find_for_export(range)?;
        Ok(export::project(&records))
    }

    /// Encode the rows of `range` as a downloadable file.
    pub fn export(
        &self,
        store: &Store,
        range: &TimeRange,
        format: ExportFormat,
    ) -> Result<ExportFile> {
        let encoder = export::encoder_for(format)?;
        let rows = self.export_rows(store, range)?;
        let bytes = encoder.encode(&rows)?;

        Ok(ExportFile {
            content_type: format.content_type(),
            filename: ExportFile::filename_for(format, self.now()),
            bytes,
        })
    }
}
