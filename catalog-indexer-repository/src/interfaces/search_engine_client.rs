//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch,
//! Elasticsearch, mocks for testing).

use async_trait::async_trait;

use crate::errors::SearchError;
use catalog_indexer_shared::{DocumentResult, SearchPage, SearchRequest, WriteOperation};

/// Abstract interface for search engine operations.
///
/// The indexing pipeline depends only on [`bulk_write`](Self::bulk_write);
/// the remaining methods cover the query interface and index
/// administration.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`: a single client instance is
/// shared across concurrent batch submissions.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Submit a group of write operations in one bulk call.
    ///
    /// Returns one [`DocumentResult`] per operation, in submission order.
    /// A per-document rejection is reported inside the result sequence; an
    /// `Err` means the call failed as a whole and nothing about the
    /// individual operations is known.
    async fn bulk_write(
        &self,
        operations: &[WriteOperation],
    ) -> Result<Vec<DocumentResult>, SearchError>;

    /// Execute a filtered, paginated query against a collection.
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError>;

    /// Check whether an index exists.
    async fn index_exists(&self, name: &str) -> Result<bool, SearchError>;

    /// Create an index with the catalog mappings.
    ///
    /// Succeeds without side effects if the index already exists.
    async fn create_index(&self, name: &str) -> Result<(), SearchError>;

    /// Delete an index.
    async fn delete_index(&self, name: &str) -> Result<(), SearchError>;

    /// Copy all documents from `source` into `dest`.
    async fn reindex(&self, source: &str, dest: &str) -> Result<(), SearchError>;

    /// Check if the search engine is reachable.
    async fn health_check(&self) -> Result<bool, SearchError>;
}
