//! Pagination types for list queries.

use serde::{Deserialize, Serialize};

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    /// Creates a page request, clamping page and size to at least 1.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    /// Cuts one page out of an already ordered in-memory list.
    #[must_use]
    pub fn slice<T: Clone>(&self, items: &[T]) -> PageResponse<T> {
        let total = items.len() as u64;
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX).min(items.len());
        let end = start
            .saturating_add(usize::try_from(self.limit()).unwrap_or(usize::MAX))
            .min(items.len());
        PageResponse::new(items[start..end].to_vec(), self.page, self.per_page, total)
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u32,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = if total == 0 {
            1
        } else {
            u32::try_from(total.div_ceil(u64::from(per_page.max(1)))).unwrap_or(u32::MAX)
        };

        Self {
            data,
            meta: PageMeta {
                page,
                per_page,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let req = PageRequest::new(3, 10);
        assert_eq!(req.offset(), 20);
        assert_eq!(req.limit(), 10);
    }

    #[test]
    fn test_new_clamps_to_one() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 1);
    }

    #[test]
    fn test_total_pages() {
        let page: PageResponse<u8> = PageResponse::new(vec![], 1, 10, 21);
        assert_eq!(page.meta.total_pages, 3);
        let empty: PageResponse<u8> = PageResponse::new(vec![], 1, 10, 0);
        assert_eq!(empty.meta.total_pages, 1);
    }

    #[test]
    fn test_slice_pages_through_list() {
        let items: Vec<u32> = (1..=25).collect();
        let second = PageRequest::new(2, 10).slice(&items);
        assert_eq!(second.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(second.meta.total, 25);

        let past_end = PageRequest::new(9, 10).slice(&items);
        assert!(past_end.data.is_empty());
    }
}
