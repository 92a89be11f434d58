//! One-shot bulk save for in-memory record collections.
//!
//! Unlike the streaming coordinator this path holds the whole collection,
//! transforms it up front, and submits a single bulk request.

use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::transformer::RecordTransformer;
use catalog_indexer_repository::SearchEngineClient;
use catalog_indexer_shared::{BatchResult, DocumentFailure, Record};

/// Outcome of a [`save_records`] call.
#[derive(Debug, Clone, Default)]
pub struct SaveSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failure_reasons: Vec<DocumentFailure>,
}

/// Transform and index a collection of records in one bulk submission.
///
/// Records without an identifier are counted as failures and skipped; the
/// rest are written together. A transport failure on the submission itself
/// is fatal and loses no per-record information the caller did not already
/// have.
pub async fn save_records(
    client: &dyn SearchEngineClient,
    records: Vec<Record>,
    collection: &str,
    id_field: &str,
) -> Result<SaveSummary, PipelineError> {
    let transformer = RecordTransformer::new().with_id_field(id_field);

    let mut operations = Vec::with_capacity(records.len());
    let mut failures: Vec<DocumentFailure> = Vec::new();
    for record in records {
        match transformer.transform(collection, record) {
            Ok(op) => operations.push(op),
            Err(e) => {
                warn!(error = %e, "Record skipped during save");
                failures.push(DocumentFailure {
                    document_id: None,
                    reason: e.into(),
                });
            }
        }
    }

    if operations.is_empty() {
        return Ok(SaveSummary {
            succeeded: 0,
            failed: failures.len(),
            failure_reasons: failures,
        });
    }

    let results = client
        .bulk_write(&operations)
        .await
        .map_err(|e| PipelineError::batch_transport(operations.len(), e.to_string()))?;
    let batch = BatchResult::classify(0, &operations, &results);

    let summary = SaveSummary {
        succeeded: batch.succeeded,
        failed: batch.failed + failures.len(),
        failure_reasons: {
            let mut reasons = failures;
            reasons.extend(batch.failure_reasons);
            reasons
        },
    };
    info!(
        collection = %collection,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Bulk save complete"
    );
    Ok(summary)
}
