//! Shared data model for the weatherdash analytics engine.
//!
//! This crate holds the types exchanged between the store, the analytics
//! core and the HTTP service. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use weatherdash_types::{MetricStats, Pagination, TimeRange};
//!
//! let stats = MetricStats::from_values([20.0, 24.0, 22.0]);
//! assert_eq!(stats.avg, 22.0);
//!
//! let page = Pagination::new(2, 25).unwrap();
//! assert_eq!(page.offset(), 25);
//!
//! assert!(TimeRange::unbounded().validate().is_ok());
//! ```

pub mod alert;
pub mod error;
pub mod pagination;
pub mod range;
pub mod record;
pub mod stats;

pub use alert::{Alert, AlertKind, InsightStatus};
pub use error::{ValidationError, ValidationResult};
pub use pagination::{Page, Pagination};
pub use range::TimeRange;
pub use record::{NewWeatherRecord, WeatherRecord};
pub use stats::{MetricStats, SummaryStats, TimeseriesPoint};
