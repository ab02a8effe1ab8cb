//! Page requests and the resolved page description.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A requested page: zero-based index and page size.
///
/// A size of `0` disables paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    pub index: usize,
    /// Number of rows per page.
    pub size: usize,
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    /// Creates a request for the first page.
    pub fn first(size: usize) -> Self {
        Self::new(0, size)
    }

    /// Returns the request for the following page.
    pub fn next(self) -> Self {
        Self::new(self.index.saturating_add(1), self.size)
    }

    /// Returns the request for the preceding page (saturating at zero).
    pub fn prev(self) -> Self {
        Self::new(self.index.saturating_sub(1), self.size)
    }
}

/// The effective page after clamping a [`PageRequest`] to the row count.
///
/// # Example
///
/// ```
/// use gridsource_lib::query::{PageInfo, PageRequest};
///
/// // 12 rows, 5 per page: 3 pages. Page 50 clamps to the last one.
/// let info = PageInfo::resolve(Some(PageRequest::new(50, 5)), 12);
/// assert_eq!(info.index, 2);
/// assert_eq!(info.page_count, 3);
/// assert_eq!(info.range(), 10..12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// Effective zero-based page index.
    pub index: usize,
    /// Page size (`0` when paging is disabled).
    pub size: usize,
    /// Number of rows being paged.
    pub total_rows: usize,
    /// Number of pages (`0` when there are no rows).
    pub page_count: usize,
}

impl PageInfo {
    /// Resolves a page request against `total_rows`.
    ///
    /// Out-of-range indexes clamp to the last page. With no request, or a size
    /// of zero, all rows form a single page.
    pub fn resolve(request: Option<PageRequest>, total_rows: usize) -> Self {
        let size = match request {
            Some(req) if req.size > 0 => req.size,
            _ => {
                return Self {
                    index: 0,
                    size: 0,
                    total_rows,
                    page_count: usize::from(total_rows > 0),
                };
            }
        };

        let page_count = total_rows.div_ceil(size);
        let requested = request.map(|r| r.index).unwrap_or(0);
        let index = requested.min(page_count.saturating_sub(1));

        Self {
            index,
            size,
            total_rows,
            page_count,
        }
    }

    /// Describes a page served by the trigger handler.
    ///
    /// The handler already sliced the rows, so the requested index is taken
    /// as-is and `total_rows` is the count the handler reported.
    pub fn remote(request: Option<PageRequest>, total_rows: usize) -> Self {
        match request {
            Some(req) if req.size > 0 => Self {
                index: req.index,
                size: req.size,
                total_rows,
                page_count: total_rows.div_ceil(req.size),
            },
            _ => Self::resolve(None, total_rows),
        }
    }

    /// Returns the row range covered by this page.
    pub fn range(&self) -> Range<usize> {
        if self.size == 0 {
            return 0..self.total_rows;
        }
        let start = (self.index * self.size).min(self.total_rows);
        let end = (start + self.size).min(self.total_rows);
        start..end
    }

    /// Returns `true` if a page follows this one.
    pub fn has_next(&self) -> bool {
        self.index + 1 < self.page_count
    }

    /// Returns `true` if a page precedes this one.
    pub fn has_prev(&self) -> bool {
        self.index > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_page() {
        let info = PageInfo::resolve(Some(PageRequest::new(1, 5)), 12);
        assert_eq!(info.index, 1);
        assert_eq!(info.range(), 5..10);
        assert!(info.has_next());
        assert!(info.has_prev());
    }

    #[test]
    fn test_out_of_range_clamps_to_last_page() {
        let info = PageInfo::resolve(Some(PageRequest::new(50, 5)), 15);
        assert_eq!(info.page_count, 3);
        assert_eq!(info.index, 2);
        assert_eq!(info.range(), 10..15);
        assert!(!info.has_next());
    }

    #[test]
    fn test_empty_collection_yields_empty_range() {
        let info = PageInfo::resolve(Some(PageRequest::new(3, 5)), 0);
        assert_eq!(info.page_count, 0);
        assert_eq!(info.index, 0);
        assert!(info.range().is_empty());
    }

    #[test]
    fn test_zero_size_disables_paging() {
        let info = PageInfo::resolve(Some(PageRequest::new(4, 0)), 7);
        assert_eq!(info.range(), 0..7);
        assert_eq!(info.page_count, 1);
    }

    #[test]
    fn test_no_request() {
        let info = PageInfo::resolve(None, 7);
        assert_eq!(info.range(), 0..7);
    }

    #[test]
    fn test_remote_page_is_not_clamped() {
        let info = PageInfo::remote(Some(PageRequest::new(7, 10)), 45);
        assert_eq!(info.index, 7);
        assert_eq!(info.page_count, 5);
    }

    #[test]
    fn test_page_request_deserialize() {
        let req: PageRequest = serde_json::from_str(r#"{"index":2,"size":25}"#).unwrap();
        assert_eq!(req, PageRequest::new(2, 25));
        assert_eq!(req.prev().index, 1);
        assert_eq!(req.next().index, 3);
    }
}
