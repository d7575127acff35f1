use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Maps out-of-range values to the defaults.
    pub fn normalized(self) -> Self {
        let page = self.page.max(DEFAULT_PAGE);
        let page_size = if (1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            self.page_size
        } else {
            DEFAULT_PAGE_SIZE
        };
        Self { page, page_size }
    }

    /// Number of rows to skip. Expects a normalized pagination.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Number of pages needed to hold `total` results; `0` when empty.
    pub fn total_pages(&self, total: u64) -> u64 {
        if total == 0 || self.page_size == 0 {
            return 0;
        }
        total.div_ceil(u64::from(self.page_size))
    }
}
