//! # Pagination
//!
//! Page numbers and sizes are normalized, never rejected.

use serde::Serialize;

/// Default page size when none (or an unusable one) is given
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// A normalized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Normalize raw page parameters.
    ///
    /// - page missing, unparsable or < 1 becomes 1
    /// - page_size missing, unparsable or < 1 becomes `default_size`
    /// - page_size above `max_size` is clamped to `max_size`
    pub fn normalize(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: u32,
        max_size: u32,
    ) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .map(|p| p.min(u32::MAX as i64) as u32)
            .unwrap_or(1);

        let page_size = page_size
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|s| *s >= 1)
            .map(|s| s.min(max_size as i64) as u32)
            .unwrap_or(default_size);

        Self { page, page_size }
    }

    /// Rows to skip before this page
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }
}

/// ceil(total / page_size), and 1 for an empty result
pub fn page_count(total: u64, page_size: u32) -> u64 {
    let size = page_size.max(1) as u64;
    total.div_ceil(size).max(1)
}

/// Paginated response envelope
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub pages: u64,
    pub items: Vec<T>,
}

impl<T: Serialize> Page<T> {
    pub fn new(request: PageRequest, total: u64, items: Vec<T>) -> Self {
        Self {
            page: request.page,
            page_size: request.page_size,
            total,
            pages: page_count(total, request.page_size),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(page: Option<&str>, size: Option<&str>) -> PageRequest {
        PageRequest::normalize(page, size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    #[test]
    fn test_defaults() {
        assert_eq!(normalize(None, None), PageRequest::default());
    }

    #[test]
    fn test_invalid_values_normalized() {
        assert_eq!(normalize(Some("0"), Some("0")), PageRequest::default());
        assert_eq!(normalize(Some("-3"), Some("abc")), PageRequest::default());
        assert_eq!(normalize(Some("x"), Some("")), PageRequest::default());
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(normalize(None, Some("1000")).page_size, MAX_PAGE_SIZE);
        assert_eq!(normalize(None, Some("100")).page_size, 100);
        assert_eq!(normalize(None, Some("1")).page_size, 1);
    }

    #[test]
    fn test_offset() {
        let request = normalize(Some("3"), Some("20"));
        assert_eq!(request.offset(), 40);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 50), 1);
        assert_eq!(page_count(1, 50), 1);
        assert_eq!(page_count(50, 50), 1);
        assert_eq!(page_count(51, 50), 2);
        assert_eq!(page_count(5, 2), 3);
    }

    #[test]
    fn test_page_envelope_serialization() {
        let page = Page::new(normalize(Some("2"), Some("2")), 5, vec![3, 4]);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["page"], 2);
        assert_eq!(json["page_size"], 2);
        assert_eq!(json["total"], 5);
        assert_eq!(json["pages"], 3);
        assert_eq!(json["items"], serde_json::json!([3, 4]));
    }
}
