//! Page/limit pagination used by every list endpoint.

use serde::Serialize;

/// Largest accepted page size.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a user-provided page size to `1..=max`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a 1-based page number to at least 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Row offset for a 1-based page.
///
/// Saturates instead of overflowing, so an absurd page lands past the last
/// row and yields an empty page.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(limit.max(0))
}

/// Pagination block returned next to list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            current: page,
            pages,
            total,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_uses_default_when_none() {
        assert_eq!(clamp_limit(None, 12, MAX_PAGE_LIMIT), 12);
    }

    #[test]
    fn clamp_limit_respects_bounds() {
        assert_eq!(clamp_limit(Some(500), 12, MAX_PAGE_LIMIT), 100);
        assert_eq!(clamp_limit(Some(0), 12, MAX_PAGE_LIMIT), 1);
    }

    #[test]
    fn offset_for_third_page() {
        assert_eq!(page_offset(clamp_page(Some(3)), 10), 20);
        assert_eq!(page_offset(clamp_page(Some(-2)), 10), 0);
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        assert_eq!(page_offset(clamp_page(Some(i64::MAX)), 100), i64::MAX);
        assert_eq!(page_offset(i64::MIN, 10), 0);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 21).pages, 3);
        assert_eq!(Pagination::new(1, 10, 20).pages, 2);
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
    }
}
