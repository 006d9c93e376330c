//! Page arithmetic for listing queries.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    /// Build a page request, rejecting `page < 1` or `limit < 1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use weatherdash_types::Pagination;
    ///
    /// let p = Pagination::new(3, 50).unwrap();
    /// assert_eq!(p.offset(), 100);
    /// assert!(p.has_next(151));
    /// assert!(!p.has_next(150));
    /// assert!(Pagination::new(0, 50).is_err());
    /// ```
    pub fn new(page: u32, limit: u32) -> ValidationResult<Self> {
        if page < 1 {
            return Err(ValidationError::InvalidPagination {
                field: "page",
                value: page,
            });
        }
        if limit < 1 {
            return Err(ValidationError::InvalidPagination {
                field: "limit",
                value: limit,
            });
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip: `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Whether records remain after this page: `page * limit < total`.
    pub fn has_next(&self, total: u64) -> bool {
        u64::from(self.page) * u64::from(self.limit) < total
    }
}

/// One page of results plus the metadata needed to fetch the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "data")]
    pub records: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, pagination: Pagination, total: u64) -> Self {
        Self {
            records,
            page: pagination.page(),
            limit: pagination.limit(),
            total,
            has_next: pagination.has_next(total),
        }
    }
}
