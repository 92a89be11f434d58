//! Search request and response shapes for the query interface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Record;

/// Default number of results per page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// A paginated, filtered query against one collection.
///
/// Page numbers are 1-based. Filter values are interpreted by the engine
/// layer: `datetime` as an instant or `start/end` range, `intersects` as a
/// GeoJSON geometry, everything else as an exact match on the record's
/// `properties`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Target collection (index) name.
    pub collection: String,
    /// Filter parameters, keyed by field name.
    pub filters: Map<String, Value>,
    /// 1-based page number.
    pub page: usize,
    /// Results per page.
    pub page_size: usize,
}

impl SearchRequest {
    /// Create a request for the first page with no filters.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Map::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Add a filter parameter.
    pub fn with_filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    /// Set the page number (1-based; clamped to at least 1).
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Offset of the first result for this page.
    pub fn from_offset(&self) -> usize {
        (self.page.max(1) - 1) * self.page_size
    }
}

/// Pagination metadata echoed back to the caller.
///
/// `page` and `limit` reflect what the caller asked for, not engine
/// internals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageProperties {
    /// Total matching documents in the collection.
    pub found: u64,
    /// The requested page number.
    pub page: usize,
    /// The requested page size.
    pub limit: usize,
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    /// Pagination metadata.
    pub properties: PageProperties,
    /// Matching records, in relevance order.
    pub results: Vec<Record>,
}

impl SearchPage {
    /// A page with no results.
    pub fn empty(request: &SearchRequest) -> Self {
        Self {
            properties: PageProperties {
                found: 0,
                page: request.page,
                limit: request.page_size,
            },
            results: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_offset() {
        let request = SearchRequest::new("catalog").with_page(2).with_page_size(20);
        assert_eq!(request.from_offset(), 20);

        let request = SearchRequest::new("catalog").with_page(1).with_page_size(50);
        assert_eq!(request.from_offset(), 0);

        let request = SearchRequest::new("catalog").with_page(5).with_page_size(10);
        assert_eq!(request.from_offset(), 40);
    }

    #[test]
    fn test_page_clamped_to_one() {
        let request = SearchRequest::new("catalog").with_page(0);
        assert_eq!(request.page, 1);
        assert_eq!(request.from_offset(), 0);
    }

    #[test]
    fn test_builder() {
        let request = SearchRequest::new("catalog")
            .with_filter("eo:cloud_cover", json!(10))
            .with_page(3)
            .with_page_size(15);

        assert_eq!(request.collection, "catalog");
        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.page, 3);
        assert_eq!(request.page_size, 15);
    }

    #[test]
    fn test_empty_page_echoes_request() {
        let request = SearchRequest::new("catalog").with_page(4).with_page_size(20);
        let page = SearchPage::empty(&request);

        assert_eq!(page.properties.found, 0);
        assert_eq!(page.properties.page, 4);
        assert_eq!(page.properties.limit, 20);
        assert!(page.results.is_empty());
    }
}
