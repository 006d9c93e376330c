//! Query builder for weather-log records.
//!
//! [`RecordQuery`] follows the builder pattern: every filter is optional and
//! can be chained in any order. The same filters drive the record, count,
//! aggregate and timeseries statements so they always agree on the window.
//!
//! # Example
//!
//! ```
//! use weatherdash_store::{Store, RecordQuery};
//! use time::{OffsetDateTime, Duration};
//!
//! let store = Store::open_in_memory()?;
//! let yesterday = OffsetDateTime::now_utc() - Duration::hours(24);
//!
//! // Newest records of the last day, second page of 50
//! let query = RecordQuery::new()
//!     .since(yesterday)
//!     .limit(50)
//!     .offset(50);
//! let records = store.query_records(&query)?;
//! assert!(records.is_empty());
//! # Ok::<(), weatherdash_store::Error>(())
//! ```

use time::{Duration, OffsetDateTime, UtcOffset};
use weatherdash_types::TimeRange;

/// Columns read back into a [`WeatherRecord`](weatherdash_types::WeatherRecord).
pub(crate) const RECORD_COLUMNS: &str = "timestamp_ms, location, latitude, longitude, \
     temperature, feels_like, humidity, wind_speed, condition, rain_probability";

/// Columns read back into a [`TimeseriesPoint`](weatherdash_types::TimeseriesPoint).
pub(crate) const TIMESERIES_COLUMNS: &str = "timestamp_ms, temperature, humidity";

/// Convert a timestamp to the stored millisecond representation.
pub(crate) fn to_millis(time: OffsetDateTime) -> i64 {
    let millis = time.unix_timestamp_nanos().div_euclid(1_000_000);
    i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
}

/// The timestamp as it reads back from the store: UTC, whole milliseconds.
pub(crate) fn to_stored_precision(time: OffsetDateTime) -> OffsetDateTime {
    let utc = time.to_offset(UtcOffset::UTC);
    utc - Duration::nanoseconds(i64::from(utc.nanosecond() % 1_000_000))
}

/// Fluent query builder for stored records.
///
/// Queries built with [`RecordQuery::new`] return results ordered by timestamp descending
/// (newest first). Records sharing a timestamp are ordered by insertion
/// id in the same direction.
#[derive(Debug, Default, Clone)]
pub struct RecordQuery {
    /// Include only records at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only records at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Number of results to skip.
    pub offset: Option<u64>,
    /// Order by timestamp descending (newest first).
    pub newest_first: bool,
}

impl RecordQuery {
    /// Create a new query: no bounds, no limit, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Apply both bounds of a [`TimeRange`].
    pub fn range(mut self, range: &TimeRange) -> Self {
        self.since = range.from;
        self.until = range.to;
        self
    }

    /// Filter to records at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to records at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(since) = self.since {
            conditions.push("timestamp_ms >= ?");
            params.push(Box::new(to_millis(since)));
        }

        if let Some(until) = self.until {
            conditions.push("timestamp_ms <= ?");
            params.push(Box::new(to_millis(until)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build an ordered, paginated SELECT over the given columns.
    pub(crate) fn build_select(&self, columns: &str) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT {columns} FROM weather_logs {where_clause} \
             ORDER BY timestamp_ms {order}, id {order}"
        );

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite only accepts OFFSET after a LIMIT clause
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        sql
    }

    /// Build a COUNT over the filtered rows, ignoring limit and offset.
    pub(crate) fn build_count(&self) -> String {
        let (where_clause, _) = self.build_where();
        format!("SELECT COUNT(*) FROM weather_logs {where_clause}")
    }

    /// Build the min/max/avg aggregate over the filtered rows.
    pub(crate) fn build_aggregate(&self) -> String {
        let (where_clause, _) = self.build_where();
        format!(
            "SELECT COUNT(*), \
             MIN(temperature), MAX(temperature), AVG(temperature), \
             MIN(humidity), MAX(humidity), AVG(humidity), \
             MIN(wind_speed), MAX(wind_speed), AVG(wind_speed) \
             FROM weather_logs {where_clause}"
        )
    }
}
