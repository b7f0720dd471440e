use serde::Deserialize;

/// Raw `?page=&limit=` query. Kept as strings so junk values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub offset: u64,
}

impl Pagination {
    /// `page` is 0-based. A missing, zero or unparseable `limit` means
    /// `default_limit`; anything above `max_limit` is clamped.
    pub fn new(page: Option<&str>, limit: Option<&str>, default_limit: u32, max_limit: u32) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let limit = limit
            .and_then(|l| l.trim().parse::<u32>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .min(max_limit);

        Self {
            page,
            limit,
            offset: u64::from(page) * u64::from(limit),
        }
    }

    pub fn from_query(query: &PageQuery, default_limit: u32, max_limit: u32) -> Self {
        Self::new(
            query.page.as_deref(),
            query.limit.as_deref(),
            default_limit,
            max_limit,
        )
    }

    /// More rows exist past this page iff `total > (page + 1) * limit`.
    pub fn has_more(&self, total: u64) -> bool {
        total > (u64::from(self.page) + 1) * u64::from(self.limit)
    }
}
