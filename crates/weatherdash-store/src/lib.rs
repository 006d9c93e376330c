//! Local persistence for weather-log records.
//!
//! This crate provides SQLite-based storage for observations collected from
//! the upstream weather provider or posted by clients.
//!
//! # Features
//!
//! - Append-only record log indexed by observation time
//! - Paginated range queries with totals
//! - Min/max/avg aggregation done inside SQLite
//! - Timeseries and export projections
//!
//! # Example
//!
//! ```no_run
//! use weatherdash_store::{Store, RecordQuery};
//!
//! let store = Store::open_default()?;
//!
//! let query = RecordQuery::new().limit(10);
//! let records = store.query_records(&query)?;
//! # Ok::<(), weatherdash_store::Error>(())
//! ```

mod error;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use queries::RecordQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/weatherdash/weather.db`
/// - macOS: `~/Library/Application Support/weatherdash/weather.db`
/// - Windows: `C:\Users\<user>\AppData\Local\weatherdash\weather.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("weatherdash")
        .join("weather.db")
}
