//! Page-number pagination helpers.

use chaptrack_api_types::PaginationMeta;
use thiserror::Error;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("Page must be a positive integer")]
    InvalidPage,
    #[error("Limit must be between 1 and 100")]
    InvalidLimit,
}

/// A validated `(page, limit)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PaginationError::InvalidLimit);
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn meta(&self, total: u64) -> PaginationMeta {
        let total_pages = total.div_ceil(u64::from(self.limit));
        PaginationMeta {
            current_page: self.page,
            total_pages,
            total_chapters: total,
            has_next_page: u64::from(self.page) < total_pages,
            has_prev_page: self.page > 1,
            limit: self.limit,
        }
    }
}
