//! Page slicing for ticket lists.

use serde::Serialize;

/// Page metadata returned next to a slice of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Zero-based page actually served.
    pub page_no: usize,
    /// Items per page.
    pub page_size: usize,
    /// Items across all pages.
    pub total_items: usize,
    /// Number of pages; never zero.
    pub total_pages: usize,
}

/// Splits result lists into fixed-size pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingService {
    page_size: usize,
}

impl PagingService {
    /// Build a pager; a zero size is treated as one.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Items per page.
    #[must_use]
    pub const fn page_size(&self) -> usize { self.page_size }

    /// Page metadata for `total_items`, clamping `requested` into range.
    #[must_use]
    pub fn page(&self, total_items: usize, requested: usize) -> Page {
        let total_pages = total_items.div_ceil(self.page_size).max(1);
        Page {
            page_no: requested.min(total_pages - 1),
            page_size: self.page_size,
            total_items,
            total_pages,
        }
    }

    /// Take the requested page out of `items`.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>, requested: usize) -> (Vec<T>, Page) {
        let page = self.page(items.len(), requested);
        let slice = items
            .into_iter()
            .skip(page.page_no * page.page_size)
            .take(page.page_size)
            .collect();
        (slice, page)
    }
}
