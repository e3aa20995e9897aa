//! Pagination types
//!
//! Lists respond with `{ data, meta: { total, page, limit, total_pages } }`.

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_LIMIT: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 100)
    pub limit: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page is clamped to minimum of 1
    /// - Limit is clamped to 1..=100
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// SQL LIMIT value.
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// Page metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: Pagination) -> Self {
        let total = total.max(0);
        let total_pages = if total == 0 {
            0
        } else {
            u32::try_from((total + i64::from(page.limit) - 1) / i64::from(page.limit))
                .unwrap_or(u32::MAX)
        };
        Self {
            data,
            meta: PageMeta {
                total,
                page: page.page,
                limit: page.limit,
                total_pages,
            },
        }
    }

    /// Convert each item, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// Query parameters for pagination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationParams {
    /// Resolve against a per-endpoint default limit.
    pub fn or_default_limit(self, default_limit: u32) -> Pagination {
        Pagination::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_limit),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_calculation() {
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(2, 10).offset(), 10);
        assert_eq!(Pagination::new(3, 25).offset(), 50);
    }

    #[test]
    fn clamps_page_and_limit() {
        assert_eq!(Pagination::new(0, 10).page, 1);
        assert_eq!(Pagination::new(1, 0).limit, 1);
        assert_eq!(Pagination::new(1, 999).limit, 100);
    }

    #[test]
    fn default_limit_applies_only_when_absent() {
        let params = PaginationParams::default();
        assert_eq!(params.or_default_limit(20), Pagination::new(1, 20));

        let params = PaginationParams {
            page: Some(3),
            limit: Some(5),
        };
        assert_eq!(params.or_default_limit(20), Pagination::new(3, 5));
    }

    #[test]
    fn total_pages() {
        let page = Pagination::new(1, 10);
        assert_eq!(Paginated::<()>::new(vec![], 0, page).meta.total_pages, 0);
        assert_eq!(Paginated::<()>::new(vec![], 25, page).meta.total_pages, 3);
        assert_eq!(Paginated::<()>::new(vec![], 100, page).meta.total_pages, 10);
    }

    #[test]
    fn serializes_envelope() {
        let page = Paginated::new(vec![1, 2], 2, Pagination::new(1, 10));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["meta"]["total_pages"], 1);
    }
}
