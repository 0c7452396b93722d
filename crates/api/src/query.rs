//! Shared query parameter types for API handlers.

use serde::Deserialize;
use coursemart_core::pagination::{clamp_limit, clamp_page, page_offset, MAX_PAGE_LIMIT};

/// Page-based pagination parameters (`?page=&limit=`).
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Resolve to `(page, limit, offset)` using the endpoint's default size.
    pub fn resolve(&self, default_limit: i64) -> (i64, i64, i64) {
        let page = clamp_page(self.page);
        let limit = clamp_limit(self.limit, default_limit, MAX_PAGE_LIMIT);
        (page, limit, page_offset(page, limit))
    }
}
