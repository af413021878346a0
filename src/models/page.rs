//! Page requests and paged results

use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One `sort=property,direction` clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: String,
    pub direction: Direction,
}

/// Requested slice of a result list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (0-indexed)
    pub page: u32,
    /// Number of items per page
    pub size: u32,
    /// Sort clauses, most significant first
    pub sort: Vec<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: 20,
            sort: Vec::new(),
        }
    }
}

impl PageRequest {
    /// Create a page request without sorting
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
            sort: Vec::new(),
        }
    }

    /// Add a sort clause
    pub fn sorted_by(mut self, property: &str, direction: Direction) -> Self {
        self.sort.push(SortOrder {
            property: property.to_string(),
            direction,
        });
        self
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.size as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of matches across all pages
    pub total: i64,
    /// Current page number (0-indexed)
    pub page: u32,
    /// Number of items per page
    pub size: u32,
}

impl<T> Page<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.size == 0 || self.total <= 0 {
            return 0;
        }
        let pages = (self.total as u64).div_ceil(u64::from(self.size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < u64::from(self.total_pages())
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    /// Convert the items, keeping the paging metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(0, 20).offset(), 0);
        assert_eq!(PageRequest::new(3, 20).offset(), 60);
        assert_eq!(PageRequest::new(3, 20).limit(), 20);
    }

    #[test]
    fn test_page_request_size_at_least_one() {
        assert_eq!(PageRequest::new(0, 0).size, 1);
    }

    #[test]
    fn test_total_pages() {
        let request = PageRequest::new(0, 10);
        assert_eq!(Page::<i64>::new(vec![], 0, &request).total_pages(), 0);
        assert_eq!(Page::<i64>::new(vec![], 10, &request).total_pages(), 1);
        assert_eq!(Page::<i64>::new(vec![], 11, &request).total_pages(), 2);
    }

    #[test]
    fn test_has_next_and_prev() {
        let first = Page::<i64>::new(vec![], 25, &PageRequest::new(0, 10));
        assert!(first.has_next());
        assert!(!first.has_prev());

        let last = Page::<i64>::new(vec![], 25, &PageRequest::new(2, 10));
        assert!(!last.has_next());
        assert!(last.has_prev());
    }

    #[test]
    fn test_last_possible_page_number() {
        let page = Page::<i64>::new(vec![], 5, &PageRequest::new(u32::MAX, 1));
        assert!(!page.has_next());
        assert!(page.has_prev());
        assert_eq!(page.total_pages(), 5);
    }

    #[test]
    fn test_total_pages_saturates() {
        let page = Page::<i64>::new(vec![], i64::MAX, &PageRequest::new(0, 1));
        assert_eq!(page.total_pages(), u32::MAX);
        assert!(page.has_next());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 7, &PageRequest::new(1, 2)).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 7);
        assert_eq!(page.page, 1);
    }
}
