//! Error types for weatherdash-core.

use weatherdash_types::ValidationError;

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`WeatherAnalytics`](crate::WeatherAnalytics).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input, rejected before the store is touched.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A single-record lookup found nothing.
    #[error("No weather records found")]
    NotFound,

    /// The store could not be reached or queried.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] weatherdash_store::Error),

    /// The requested export format has no encoder.
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Export rows could not be encoded.
    #[error("Failed to encode export: {0}")]
    Encode(#[from] csv::Error),

    /// Export rows could not be written to a workbook.
    #[error("Failed to encode export: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// A timestamp could not be rendered for export.
    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl From<weatherdash_store::Error> for Error {
    fn from(err: weatherdash_store::Error) -> Self {
        match err {
            weatherdash_store::Error::Validation(e) | weatherdash_store::Error::InvalidArgument(e) => {
                Error::Validation(e)
            }
            other => Error::StoreUnavailable(other),
        }
    }
}
