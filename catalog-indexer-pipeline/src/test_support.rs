//! In-memory search engine double for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use catalog_indexer_repository::{SearchEngineClient, SearchError};
use catalog_indexer_shared::{
    DocumentOutcome, DocumentResult, SearchPage, SearchRequest, WriteOperation,
};

/// Records every successful bulk submission and can be armed to fail a
/// whole call or reject individual documents.
pub(crate) struct MockEngine {
    batches: Mutex<Vec<Vec<WriteOperation>>>,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
    reject_ids: Vec<String>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_on_call: None,
            reject_ids: Vec::new(),
        }
    }

    /// Fail the nth bulk call (1-based) with a connection error.
    pub(crate) fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Report a per-document error for these identifiers on every call.
    pub(crate) fn rejecting(mut self, ids: &[&str]) -> Self {
        self.reject_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Sizes of the batches that reached the engine, in arrival order.
    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    /// Total number of bulk calls attempted, failed ones included.
    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchEngineClient for MockEngine {
    async fn bulk_write(
        &self,
        operations: &[WriteOperation],
    ) -> Result<Vec<DocumentResult>, SearchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(SearchError::connection("simulated transport failure"));
        }

        self.batches.lock().unwrap().push(operations.to_vec());

        Ok(operations
            .iter()
            .map(|op| {
                let outcome = if self.reject_ids.contains(&op.document_id) {
                    DocumentOutcome::Error {
                        reason: "mapper_parsing_exception".to_string(),
                    }
                } else {
                    DocumentOutcome::Ok
                };
                DocumentResult {
                    document_id: op.document_id.clone(),
                    outcome,
                }
            })
            .collect())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        Ok(SearchPage::empty(request))
    }

    async fn index_exists(&self, _index: &str) -> Result<bool, SearchError> {
        Ok(true)
    }

    async fn create_index(&self, _index: &str) -> Result<(), SearchError> {
        Ok(())
    }

    async fn delete_index(&self, _index: &str) -> Result<(), SearchError> {
        Ok(())
    }

    async fn reindex(&self, _source: &str, _dest: &str) -> Result<(), SearchError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}
