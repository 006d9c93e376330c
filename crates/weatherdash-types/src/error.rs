//! Validation errors raised before any store access.

use thiserror::Error;

/// Errors produced while validating input to the analytics engine.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required text field was empty.
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },

    /// A numeric field was NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    /// A numeric field was outside its accepted range.
    #[error("{field} {value} is out of range ({min} to {max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The lower bound of a time range is after its upper bound.
    #[error("invalid time range: 'from' ({from}) must be before or equal to 'to' ({to})")]
    InvalidRange { from: String, to: String },

    /// Page number or page size below 1.
    #[error("{field} must be at least 1 (got {value})")]
    InvalidPagination { field: &'static str, value: u32 },
}

/// Result type alias using [`ValidationError`].
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
