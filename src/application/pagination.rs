//! Offset pagination for the public feed.

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// A validated `(page, limit)` pair. Both are at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: u32,
    limit: u32,
}

impl PageWindow {
    pub fn new(page: u32, limit: u32) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::validation("page must be a positive integer"));
        }
        if limit == 0 {
            return Err(DomainError::validation("limit must be a positive integer"));
        }
        Ok(Self { page, limit })
    }

    /// Lenient parsing for query strings: anything missing, unparsable or
    /// non-positive falls back to the defaults and `limit` is capped at
    /// [`MAX_LIMIT`].
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| {
            raw.and_then(|value| value.trim().parse::<u32>().ok())
                .filter(|value| *value > 0)
        };

        Self {
            page: parse(page).unwrap_or(DEFAULT_PAGE),
            limit: parse(limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn page(self) -> u32 {
        self.page
    }

    pub fn limit(self) -> u32 {
        self.limit
    }

    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// `ceil(total / limit)`; zero posts means zero pages.
pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPage")]
    pub total_page: u64,
    #[serde(rename = "totalItems")]
    pub total_items: u64,
}

impl PageMeta {
    pub fn new(window: PageWindow, total: u64) -> Self {
        Self {
            page: window.page(),
            limit: window.limit(),
            total_page: total_pages(total, window.limit()),
            total_items: total,
        }
    }
}
