//! Inclusive time ranges used by every read path.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{ValidationError, ValidationResult};

/// An optional `[from, to]` pair, inclusive on both ends.
///
/// A missing bound leaves that side of the range open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub to: Option<OffsetDateTime>,
}

impl TimeRange {
    /// An unbounded range matching every record.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(from: Option<OffsetDateTime>, to: Option<OffsetDateTime>) -> Self {
        Self { from, to }
    }

    /// The window of length `length` ending at `now`.
    pub fn trailing(now: OffsetDateTime, length: Duration) -> Self {
        Self {
            from: Some(now - length),
            to: Some(now),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Reject ranges whose lower bound is after the upper bound.
    pub fn validate(&self) -> ValidationResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(ValidationError::InvalidRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.from.is_none_or(|from| instant >= from) && self.to.is_none_or(|to| instant <= to)
    }
}
