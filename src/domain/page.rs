//! Page window arithmetic shared by the dispatcher and the record store.

/// Default number of items per page.
pub const DEFAULT_LIMIT: u32 = 30;

/// `limit` items starting at page `page` (1-based). `limit == 0` disables
/// pagination entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u32,
    pub page: u32,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
        }
    }
}

impl PageWindow {
    pub fn new(limit: u32, page: u32) -> Self {
        Self {
            limit,
            page: page.max(1),
        }
    }

    /// A window that never paginates.
    pub fn unlimited() -> Self {
        Self { limit: 0, page: 1 }
    }

    pub fn is_paginated(&self) -> bool {
        self.limit > 0
    }

    /// Rows to skip: `limit * (page - 1)`, or 0 when unpaginated.
    pub fn offset(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        u64::from(self.limit) * u64::from(self.page.saturating_sub(1))
    }

    /// Page that follows a result of `returned` rows.
    ///
    /// A full page implies there may be more; a short page means the end.
    pub fn next_page_after(&self, returned: usize) -> Option<u32> {
        if self.limit > 0 && returned == self.limit as usize {
            Some(self.page + 1)
        } else {
            None
        }
    }

    pub fn prev_page(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }
}
