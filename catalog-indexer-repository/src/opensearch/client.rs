//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
    BulkParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::index_config::catalog_index_body;
use crate::opensearch::queries::build_filter_query;
use catalog_indexer_shared::{
    DocumentOutcome, DocumentResult, PageProperties, SearchPage, SearchRequest, WriteOperation,
};

/// Bounded wait for the connection ping.
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// OpenSearch client implementation.
///
/// Writes go through the bulk API as upserts with engine-side conflict
/// retry; reads go through `_search` with filter queries and offset
/// pagination.
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// Construction only builds the transport; reachability is checked
    /// separately via [`health_check`](SearchEngineClient::health_check).
    pub fn new(url: &str) -> Result<Self, SearchError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Decode the `items` array of a bulk response into per-operation
    /// results, in submission order.
    ///
    /// Any non-2xx item status is an error; the engine's reported reason is
    /// carried when present.
    fn parse_bulk_items(items: &[Value]) -> Result<Vec<DocumentResult>, SearchError> {
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            // Every item is keyed by its action; all our writes are updates.
            let update = item.get("update").ok_or_else(|| {
                SearchError::parse("bulk response item has no 'update' entry")
            })?;

            let document_id = update
                .get("_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let status = update
                .get("status")
                .and_then(Value::as_u64)
                .ok_or_else(|| SearchError::parse("bulk response item has no status"))?;

            let outcome = if (200..300).contains(&status) {
                DocumentOutcome::Ok
            } else {
                let reason = update
                    .pointer("/error/reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("status {}", status));
                DocumentOutcome::Error { reason }
            };

            results.push(DocumentResult {
                document_id,
                outcome,
            });
        }

        Ok(results)
    }

    /// Build a search page from a `_search` response body.
    ///
    /// `found` comes from `hits.total` (object or bare number form); the
    /// page and limit echo the caller's request.
    fn parse_search_page(request: &SearchRequest, body: &Value) -> SearchPage {
        let total = &body["hits"]["total"];
        let found = total
            .as_u64()
            .or_else(|| total.get("value").and_then(Value::as_u64))
            .unwrap_or(0);

        let results = body["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit.get("_source").cloned())
                    .collect()
            })
            .unwrap_or_default();

        SearchPage {
            properties: PageProperties {
                found,
                page: request.page,
                limit: request.page_size,
            },
            results,
        }
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    /// Submit write operations through the bulk API.
    ///
    /// Each operation becomes an `update` action line with
    /// `retry_on_conflict`, paired with a `doc_as_upsert` body, so a write
    /// creates the document when absent and merge-updates it when present.
    #[instrument(skip(self, operations), fields(operation_count = operations.len()))]
    async fn bulk_write(
        &self,
        operations: &[WriteOperation],
    ) -> Result<Vec<DocumentResult>, SearchError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
        for op in operations {
            body.push(
                json!({
                    "update": {
                        "_index": op.collection,
                        "_id": op.document_id,
                        "retry_on_conflict": op.retry_on_conflict
                    }
                })
                .into(),
            );
            body.push(
                json!({
                    "doc": op.body,
                    "doc_as_upsert": true
                })
                .into(),
            );
        }

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::bulk_transport(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::bulk_transport(format!(
                "bulk call failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let items = body["items"]
            .as_array()
            .ok_or_else(|| SearchError::parse("bulk response has no items array"))?;

        let results = Self::parse_bulk_items(items)?;
        debug!(
            acknowledged = results.len(),
            errors = body["errors"].as_bool().unwrap_or(false),
            "Bulk call acknowledged"
        );

        Ok(results)
    }

    /// Execute a filtered, paginated search.
    #[instrument(skip(self, request), fields(collection = %request.collection, page = request.page))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let query = build_filter_query(&request.filters)?;

        debug!(
            from = request.from_offset(),
            size = request.page_size,
            "Searching collection"
        );

        let response = self
            .client
            .search(SearchParts::Index(&[&request.collection]))
            .from(request.from_offset() as i64)
            .size(request.page_size as i64)
            .body(query)
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::query(format!(
                "search failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        Ok(Self::parse_search_page(request, &body))
    }

    async fn index_exists(&self, name: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::index_admin(e.to_string()))?;

        Ok(response.status_code().is_success())
    }

    /// Create an index with the catalog mappings, skipping creation when it
    /// already exists.
    async fn create_index(&self, name: &str) -> Result<(), SearchError> {
        if self.index_exists(name).await? {
            debug!(index = %name, "Index already exists");
            return Ok(());
        }

        info!(index = %name, "Creating index");

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .body(catalog_index_body())
            .send()
            .await
            .map_err(|e| SearchError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::index_creation(format!(
                "index creation failed with status {}: {}",
                status, error_body
            )));
        }

        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchError::index_admin(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::index_admin(format!(
                "index deletion failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %name, "Deleted index");
        Ok(())
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .reindex()
            .body(json!({
                "source": { "index": source },
                "dest": { "index": dest }
            }))
            .send()
            .await
            .map_err(|e| SearchError::index_admin(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::index_admin(format!(
                "reindex failed with status {}: {}",
                status, error_body
            )));
        }

        info!(source = %source, dest = %dest, "Reindex complete");
        Ok(())
    }

    /// Ping the engine, bounded so an unresponsive host cannot hang the
    /// caller.
    async fn health_check(&self) -> Result<bool, SearchError> {
        let ping = self.client.ping().send();

        match tokio::time::timeout(PING_TIMEOUT, ping).await {
            Ok(Ok(response)) => Ok(response.status_code().is_success()),
            Ok(Err(e)) => Err(SearchError::connection(e.to_string())),
            Err(_) => Ok(false),
        }
    }
}
