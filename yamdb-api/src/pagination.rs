//! Page-number pagination for list endpoints
//!
//! Lists take `?page=N` (1-based) and answer
//!
//! ```json
//! { "count": 42, "next": "/api/v1/titles?year=1999&page=3", "previous": "/api/v1/titles?year=1999&page=1", "results": [] }
//! ```
//!
//! The first page always exists, even when empty; any later page past the
//! end is a 404.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Requested page, validated against the configured page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Validates the `page` query parameter
    pub fn new(page: Option<u32>, page_size: u32) -> ApiResult<Self> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(ApiError::field("page", "Page numbers start at 1"));
        }
        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    /// Number of pages for `count` items; never less than one
    pub fn total_pages(&self, count: i64) -> i64 {
        let size = i64::from(self.page_size.max(1));
        ((count + size - 1) / size).max(1)
    }

    /// Rejects pages past the end once the total is known
    pub fn ensure_exists(&self, count: i64) -> ApiResult<()> {
        if i64::from(self.page) > self.total_pages(count) {
            return Err(ApiError::NotFound("Invalid page".to_string()));
        }
        Ok(())
    }
}

/// One page of results
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page with relative links derived from the request URI
    pub fn new(request: PageRequest, count: i64, results: Vec<T>, uri: &Uri) -> Self {
        let page = i64::from(request.page);
        let next = (page < request.total_pages(count)).then(|| page_link(uri, page + 1));
        let previous = (page > 1).then(|| page_link(uri, page - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    /// Converts every result, keeping counts and links
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Same path and query with `page` replaced
fn page_link(uri: &Uri, page: i64) -> String {
    let mut params: Vec<&str> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .collect();

    let page_param = format!("page={page}");
    params.push(&page_param);

    format!("{}?{}", uri.path(), params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_page_request_defaults_to_first_page() {
        let request = PageRequest::new(None, 10).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn test_page_zero_rejected() {
        assert!(matches!(PageRequest::new(Some(0), 10), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(3), 10).unwrap().offset(), 20);
    }

    #[test]
    fn test_total_pages_and_bounds() {
        let request = PageRequest::new(Some(1), 10).unwrap();
        assert_eq!(request.total_pages(0), 1);
        assert_eq!(request.total_pages(10), 1);
        assert_eq!(request.total_pages(11), 2);

        // Empty first page is fine
        assert!(request.ensure_exists(0).is_ok());

        let request = PageRequest::new(Some(3), 10).unwrap();
        assert!(request.ensure_exists(21).is_ok());
        assert!(matches!(request.ensure_exists(20), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_links_preserve_query() {
        let request = PageRequest::new(Some(2), 10).unwrap();
        let page = Page::new(request, 25, vec![1, 2], &uri("/api/v1/titles?year=1999&page=2&genre=drama"));

        assert_eq!(page.next.as_deref(), Some("/api/v1/titles?year=1999&genre=drama&page=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/v1/titles?year=1999&genre=drama&page=1"));
    }

    #[test]
    fn test_links_at_edges() {
        let first = Page::new(PageRequest::new(None, 10).unwrap(), 15, Vec::<i32>::new(), &uri("/api/v1/genres"));
        assert_eq!(first.next.as_deref(), Some("/api/v1/genres?page=2"));
        assert!(first.previous.is_none());

        let only = Page::new(PageRequest::new(None, 10).unwrap(), 3, vec![1, 2, 3], &uri("/api/v1/genres"));
        assert!(only.next.is_none());
        assert!(only.previous.is_none());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(PageRequest::new(None, 2).unwrap(), 3, vec![1, 2], &uri("/x")).map(|n| n * 10);
        assert_eq!(page.results, vec![10, 20]);
        assert_eq!(page.count, 3);
        assert_eq!(page.next.as_deref(), Some("/x?page=2"));
    }
}
