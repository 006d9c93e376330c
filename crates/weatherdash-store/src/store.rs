//! Main store implementation.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info};

use weatherdash_types::{
    MetricStats, NewWeatherRecord, Pagination, SummaryStats, TimeRange, TimeseriesPoint,
    WeatherRecord,
};

use crate::error::{Error, Result};
use crate::queries::{
    RECORD_COLUMNS, RecordQuery, TIMESERIES_COLUMNS, to_millis, to_stored_precision,
};
use crate::schema;

/// SQLite-based store for weather-log records.
///
/// Records are append-only; nothing in the store updates or deletes a row.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // === Writes ===

    /// Validate and append a record, returning the stored form.
    ///
    /// `feels_like` falls back to the temperature when absent. The returned
    /// timestamp is in UTC at millisecond precision, exactly as later reads
    /// return it. The raw payload is kept alongside the row but never
    /// returned by queries.
    pub fn insert(&self, record: NewWeatherRecord) -> Result<WeatherRecord> {
        record.validate()?;

        let raw = serde_json::to_string(&record.raw)?;
        let mut stored = record.into_record();
        stored.timestamp = to_stored_precision(stored.timestamp);
        let inserted_at = to_millis(OffsetDateTime::now_utc());

        self.conn.execute(
            "INSERT INTO weather_logs (timestamp_ms, inserted_at, location, latitude, longitude,
                temperature, feels_like, humidity, wind_speed, condition, rain_probability, raw)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                to_millis(stored.timestamp),
                inserted_at,
                &stored.location,
                stored.latitude,
                stored.longitude,
                stored.temperature,
                stored.feels_like,
                stored.humidity,
                stored.wind_speed,
                &stored.condition,
                stored.rain_probability,
                raw,
            ],
        )?;

        debug!(
            "Stored record for {} at {}",
            stored.location, stored.timestamp
        );
        Ok(stored)
    }

    // === Reads ===

    /// Run a record query.
    pub fn query_records(&self, query: &RecordQuery) -> Result<Vec<WeatherRecord>> {
        let sql = query.build_select(RECORD_COLUMNS);
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_ref.as_slice(), record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Run a query returning only the timeseries projection.
    pub fn query_timeseries(&self, query: &RecordQuery) -> Result<Vec<TimeseriesPoint>> {
        let sql = query.build_select(TIMESERIES_COLUMNS);
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let points = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(TimeseriesPoint {
                    timestamp: timestamp_from_row(row, 0)?,
                    temperature: row.get(1)?,
                    humidity: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(points)
    }

    /// The record with the greatest timestamp, if any.
    pub fn find_most_recent(&self) -> Result<Option<WeatherRecord>> {
        let query = RecordQuery::new().limit(1);
        let mut records = self.query_records(&query)?;
        Ok(records.pop())
    }

    /// Count the records inside a range.
    pub fn count(&self, range: &TimeRange) -> Result<u64> {
        range.validate().map_err(Error::InvalidArgument)?;

        let query = RecordQuery::new().range(range);
        let (_, params) = query.build_where();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 =
            self.conn
                .query_row(&query.build_count(), params_ref.as_slice(), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// One page of records in a range, newest first, plus the range total.
    ///
    /// Fails with [`Error::InvalidArgument`] when `page` or `limit` is zero
    /// or the range is inverted.
    pub fn find_range(
        &self,
        range: &TimeRange,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<WeatherRecord>, u64)> {
        let pagination = Pagination::new(page, limit).map_err(Error::InvalidArgument)?;
        range.validate().map_err(Error::InvalidArgument)?;

        let query = RecordQuery::new()
            .range(range)
            .limit(pagination.limit())
            .offset(pagination.offset());

        let records = self.query_records(&query)?;
        let total = self.count(range)?;
        Ok((records, total))
    }

    /// Min/max/avg of temperature, humidity and wind speed over a range.
    ///
    /// An empty range yields all-zero statistics with a count of zero.
    pub fn aggregate(&self, range: &TimeRange) -> Result<SummaryStats> {
        range.validate().map_err(Error::InvalidArgument)?;

        let query = RecordQuery::new().range(range);
        let sql = query.build_aggregate();
        let (_, params) = query.build_where();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let stats = self.conn.query_row(&sql, params_ref.as_slice(), |row| {
            let count: i64 = row.get(0)?;
            if count == 0 {
                return Ok(SummaryStats::EMPTY);
            }
            Ok(SummaryStats {
                temperature: metric_from_row(row, 1)?,
                humidity: metric_from_row(row, 4)?,
                wind_speed: metric_from_row(row, 7)?,
                count: count as u64,
            })
        })?;

        Ok(stats)
    }

    /// Timestamp, temperature and humidity for a range, oldest first.
    pub fn find_timeseries(&self, range: &TimeRange) -> Result<Vec<TimeseriesPoint>> {
        range.validate().map_err(Error::InvalidArgument)?;
        self.query_timeseries(&RecordQuery::new().range(range).oldest_first())
    }

    /// Every record in a range for export, newest first.
    pub fn find_for_export(&self, range: &TimeRange) -> Result<Vec<WeatherRecord>> {
        range.validate().map_err(Error::InvalidArgument)?;
        self.query_records(&RecordQuery::new().range(range))
    }

    /// Every record in `[from, to]`, oldest first.
    pub fn find_for_window(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<WeatherRecord>> {
        let range = TimeRange::new(Some(from), Some(to));
        range.validate().map_err(Error::InvalidArgument)?;
        self.query_records(&RecordQuery::new().range(&range).oldest_first())
    }

    /// The raw upstream payload of the most recently inserted record at
    /// `timestamp`.
    pub fn raw_payload(&self, timestamp: OffsetDateTime) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT raw FROM weather_logs WHERE timestamp_ms = ? ORDER BY id DESC LIMIT 1",
                [to_millis(timestamp)],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(Error::from)
    }
}

fn timestamp_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let millis: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<WeatherRecord> {
    Ok(WeatherRecord {
        timestamp: timestamp_from_row(row, 0)?,
        location: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        temperature: row.get(4)?,
        feels_like: row.get(5)?,
        humidity: row.get(6)?,
        wind_speed: row.get(7)?,
        condition: row.get(8)?,
        rain_probability: row.get(9)?,
    })
}

fn metric_from_row(row: &Row<'_>, first: usize) -> rusqlite::Result<MetricStats> {
    Ok(MetricStats {
        min: row.get::<_, Option<f64>>(first)?.unwrap_or(0.0),
        max: row.get::<_, Option<f64>>(first + 1)?.unwrap_or(0.0),
        avg: row.get::<_, Option<f64>>(first + 2)?.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use time::Duration;
    use time::macros::datetime;
    use weatherdash_types::ValidationError;

    fn record_at(timestamp: OffsetDateTime, temperature: f64) -> NewWeatherRecord {
        NewWeatherRecord {
            timestamp,
            location: "Recife, Brasil".to_string(),
            latitude: -8.05,
            longitude: -34.9,
            temperature,
            feels_like: None,
            humidity: 60.0,
            wind_speed: 10.0,
            condition: "clear".to_string(),
            rain_probability: 0.1,
            raw: json!({}),
        }
    }

    fn base() -> OffsetDateTime {
        datetime!(2025-03-01 00:00:00 UTC)
    }

    fn seeded(hours: i64) -> Store {
        let store = Store::open_in_memory().unwrap();
        for h in 0..hours {
            store
                .insert(record_at(base() + Duration::hours(h), 20.0 + h as f64))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.find_most_recent().unwrap().is_none());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("weather.db");
        let store = Store::open(&path).unwrap();
        store.insert(record_at(base(), 25.0)).unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.count(&TimeRange::unbounded()).unwrap(), 1);
    }

    #[test]
    fn test_insert_defaults_feels_like() {
        let store = Store::open_in_memory().unwrap();
        let stored = store.insert(record_at(base(), 27.5)).unwrap();
        assert_eq!(stored.feels_like, 27.5);

        let mut explicit = record_at(base(), 27.5);
        explicit.feels_like = Some(30.0);
        assert_eq!(store.insert(explicit).unwrap().feels_like, 30.0);
    }

    #[test]
    fn test_insert_rejects_invalid_record() {
        let store = Store::open_in_memory().unwrap();
        let mut bad = record_at(base(), 25.0);
        bad.humidity = 140.0;

        let err = store.insert(bad).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::OutOfRange { field: "humidity", .. })));
        assert_eq!(store.count(&TimeRange::unbounded()).unwrap(), 0);
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = Store::open_in_memory().unwrap();
        let ts = datetime!(2025-03-01 12:34:56.789 UTC);
        store.insert(record_at(ts, 25.0)).unwrap();

        let latest = store.find_most_recent().unwrap().unwrap();
        assert_eq!(latest.timestamp, ts);
        assert_eq!(latest.location, "Recife, Brasil");
        assert_eq!(latest.condition, "clear");
    }

    #[test]
    fn test_find_most_recent_uses_timestamp_not_insertion_order() {
        let store = Store::open_in_memory().unwrap();
        store.insert(record_at(base() + Duration::hours(5), 30.0)).unwrap();
        store.insert(record_at(base(), 20.0)).unwrap();

        let latest = store.find_most_recent().unwrap().unwrap();
        assert_eq!(latest.temperature, 30.0);
    }

    #[test]
    fn test_find_range_pages() {
        let store = seeded(5);
        let range = TimeRange::unbounded();

        let (first, total) = store.find_range(&range, 1, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].temperature, 24.0);
        assert_eq!(first[1].temperature, 23.0);

        let (last, _) = store.find_range(&range, 3, 2).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].temperature, 20.0);

        let (beyond, total) = store.find_range(&range, 4, 2).unwrap();
        assert!(beyond.is_empty());
        assert_eq!(total, 5);
    }

    #[test]
    fn test_find_range_is_inclusive() {
        let store = seeded(5);
        let range = TimeRange::new(
            Some(base() + Duration::hours(1)),
            Some(base() + Duration::hours(3)),
        );
        let (records, total) = store.find_range(&range, 1, 50).unwrap();
        assert_eq!(total, 3);
        assert!(records.iter().all(|r| range.contains(r.timestamp)));
    }

    #[test]
    fn test_find_range_rejects_zero_page_or_limit() {
        let store = seeded(1);
        let range = TimeRange::unbounded();
        assert!(matches!(
            store.find_range(&range, 0, 10),
            Err(Error::InvalidArgument(ValidationError::InvalidPagination { field: "page", .. }))
        ));
        assert!(matches!(
            store.find_range(&range, 1, 0),
            Err(Error::InvalidArgument(ValidationError::InvalidPagination { field: "limit", .. }))
        ));
    }

    #[test]
    fn test_inverted_range_is_invalid_argument() {
        let store = seeded(1);
        let range = TimeRange::new(Some(base() + Duration::hours(1)), Some(base()));
        let err = store.aggregate(&range).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ValidationError::InvalidRange { .. })));
    }

    #[test]
    fn test_aggregate() {
        let store = seeded(3);
        let stats = store.aggregate(&TimeRange::unbounded()).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.temperature.min, 20.0);
        assert_eq!(stats.temperature.max, 22.0);
        assert!((stats.temperature.avg - 21.0).abs() < 1e-9);
        assert_eq!(stats.humidity.avg, 60.0);
        assert_eq!(stats.wind_speed.max, 10.0);
    }

    #[test]
    fn test_aggregate_empty_is_zero_filled() {
        let store = Store::open_in_memory().unwrap();
        let stats = store.aggregate(&TimeRange::unbounded()).unwrap();
        assert_eq!(stats, SummaryStats::EMPTY);
    }

    #[test]
    fn test_find_timeseries_ascending() {
        let store = Store::open_in_memory().unwrap();
        store.insert(record_at(base() + Duration::hours(2), 22.0)).unwrap();
        store.insert(record_at(base(), 20.0)).unwrap();
        store.insert(record_at(base() + Duration::hours(1), 21.0)).unwrap();

        let points = store.find_timeseries(&TimeRange::unbounded()).unwrap();
        let temps: Vec<f64> = points.iter().map(|p| p.temperature).collect();
        assert_eq!(temps, vec![20.0, 21.0, 22.0]);
        assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_find_for_export_descending() {
        let store = seeded(4);
        let records = store.find_for_export(&TimeRange::unbounded()).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_find_for_window_ascending_and_bounded() {
        let store = seeded(6);
        let records = store
            .find_for_window(base() + Duration::hours(2), base() + Duration::hours(4))
            .unwrap();
        let temps: Vec<f64> = records.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![22.0, 23.0, 24.0]);
    }

    #[test]
    fn test_raw_payload_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let mut record = record_at(base(), 25.0);
        record.raw = json!({"current": {"weather_code": 3}});
        store.insert(record).unwrap();

        let raw = store.raw_payload(base()).unwrap().unwrap();
        assert_eq!(raw["current"]["weather_code"], 3);
        assert!(store.raw_payload(base() + Duration::hours(1)).unwrap().is_none());
    }

    #[test]
    fn test_count_with_range() {
        let store = seeded(10);
        let range = TimeRange::new(Some(base() + Duration::hours(5)), None);
        assert_eq!(store.count(&range).unwrap(), 5);
    }

    #[test]
    fn test_insert_returns_what_reads_return() {
        let store = Store::open_in_memory().unwrap();
        let stored = store
            .insert(record_at(datetime!(2025-05-20 11:00:00.123456 -03:00), 24.0))
            .unwrap();

        assert_eq!(stored.timestamp, datetime!(2025-05-20 14:00:00.123 UTC));
        assert_eq!(stored.timestamp.offset(), time::UtcOffset::UTC);

        let last = store.find_most_recent().unwrap().unwrap();
        assert_eq!(stored, last);
        assert_eq!(stored.timestamp.nanosecond(), last.timestamp.nanosecond());
    }

    proptest! {
        #[test]
        fn prop_aggregate_min_le_avg_le_max(
            samples in proptest::collection::vec(
                (-40.0f64..50.0, 0.0f64..=100.0, 0.0f64..150.0),
                1..40,
            )
        ) {
            let store = Store::open_in_memory().unwrap();
            for (i, (temperature, humidity, wind_speed)) in samples.iter().enumerate() {
                let mut record = record_at(base() + Duration::minutes(i as i64), *temperature);
                record.humidity = *humidity;
                record.wind_speed = *wind_speed;
                store.insert(record).unwrap();
            }

            let stats = store.aggregate(&TimeRange::unbounded()).unwrap();
            prop_assert_eq!(stats.count, samples.len() as u64);
            for metric in [stats.temperature, stats.humidity, stats.wind_speed] {
                prop_assert!(metric.min <= metric.avg + 1e-9);
                prop_assert!(metric.avg <= metric.max + 1e-9);
            }

            let lowest = samples.iter().map(|s| s.0).fold(f64::INFINITY, f64::min);
            let highest = samples.iter().map(|s| s.0).fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(stats.temperature.min, lowest);
            prop_assert_eq!(stats.temperature.max, highest);
        }
    }
}
