//! Analytics over stored weather logs.
//!
//! [`WeatherAnalytics`] is the entry point. It answers:
//!
//! - the most recent record
//! - paginated listings
//! - range summaries (min/max/avg)
//! - chronological timeseries
//! - rule-based insights over the trailing 24 hours
//! - export projections, encoded as CSV or an xlsx workbook
//!
//! # Example
//!
//! ```
//! use weatherdash_core::{AnalyticsConfig, WeatherAnalytics};
//! use weatherdash_store::Store;
//!
//! let store = Store::open_in_memory()?;
//! let analytics = WeatherAnalytics::new(AnalyticsConfig::default());
//!
//! let insights = analytics.insights(&store)?;
//! assert!(insights.alerts.is_empty());
//! # Ok::<(), weatherdash_core::Error>(())
//! ```

pub mod aggregation;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod insights;

mod analytics;

pub use analytics::{Summary, Timeseries, WeatherAnalytics};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AnalyticsConfig, DEFAULT_PAGE_LIMIT};
pub use error::{Error, Result};
pub use export::{
    CsvEncoder, EXPORT_COLUMNS, ExportEncoder, ExportFile, ExportFormat, ExportRow, XlsxEncoder,
};
pub use insights::Insights;
