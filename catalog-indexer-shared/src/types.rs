//! Core data types that flow through the indexing pipeline.

use serde::{Deserialize, Serialize};

/// A catalog record as produced upstream.
///
/// Records are opaque to the indexer: the only field it interprets is the
/// configured identifier path. The full record body is carried verbatim
/// into the write operation.
pub type Record = serde_json::Value;

/// The kind of write performed against the search engine.
///
/// Every write in this system is an upsert: create the document if it is
/// absent, merge-update it if it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteAction {
    /// Create if absent, merge-update if present (`doc_as_upsert`).
    Upsert,
}

/// A single document write destined for the search engine's bulk API.
///
/// Built from exactly one [`Record`] by the transformer and consumed
/// exactly once by the batching writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOperation {
    /// Target collection (index) name.
    pub collection: String,
    /// Document id extracted from the record.
    pub document_id: String,
    /// The write action. Always [`WriteAction::Upsert`].
    pub action: WriteAction,
    /// Engine-side retry budget for concurrent-update conflicts.
    pub retry_on_conflict: u32,
    /// The record body, carried verbatim.
    pub body: Record,
}

/// Outcome of one operation within a bulk acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentOutcome {
    /// The write was accepted by the engine.
    Ok,
    /// The engine rejected this document.
    Error {
        /// Reason reported by the engine.
        reason: String,
    },
}

/// Per-operation status decoded from a bulk response.
///
/// The engine reports one status per submitted operation, in submission
/// order. Any non-success status is an error; there is no third state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// The document the status refers to.
    pub document_id: String,
    /// Accepted or rejected.
    pub outcome: DocumentOutcome,
}

impl DocumentResult {
    /// Whether the engine accepted the write.
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Ok)
    }
}

/// Why a record or document failed to index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The record lacked its identifier field.
    MissingIdentifier {
        /// The configured id field path.
        field: String,
    },
    /// The engine rejected the document write.
    DocumentWrite {
        /// Reason reported by the engine.
        reason: String,
    },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdentifier { field } => {
                write!(f, "record is missing identifier field '{}'", field)
            }
            Self::DocumentWrite { reason } => write!(f, "document write rejected: {}", reason),
        }
    }
}

/// A single recorded failure, attributed to a document where one is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Document id, when the record got far enough to have one.
    pub document_id: Option<String>,
    /// What went wrong.
    pub reason: FailureReason,
}

/// Result of one acknowledged batch submission.
///
/// `batch_id` is the submission sequence number; acknowledgments may
/// arrive out of order and are aggregated by this identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Submission sequence number of the batch.
    pub batch_id: u64,
    /// Documents the engine accepted.
    pub succeeded: usize,
    /// Documents the engine rejected.
    pub failed: usize,
    /// Reasons for the rejected documents.
    pub failure_reasons: Vec<DocumentFailure>,
}

impl BatchResult {
    /// Classify per-document statuses against the operations that produced
    /// them. Statuses arrive in submission order, so the two sequences are
    /// zipped positionally.
    pub fn classify(batch_id: u64, operations: &[WriteOperation], results: &[DocumentResult]) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut failure_reasons = Vec::new();

        for (op, result) in operations.iter().zip(results.iter()) {
            match &result.outcome {
                DocumentOutcome::Ok => succeeded += 1,
                DocumentOutcome::Error { reason } => {
                    failed += 1;
                    failure_reasons.push(DocumentFailure {
                        document_id: Some(op.document_id.clone()),
                        reason: FailureReason::DocumentWrite {
                            reason: reason.clone(),
                        },
                    });
                }
            }
        }

        Self {
            batch_id,
            succeeded,
            failed,
            failure_reasons,
        }
    }
}

/// Terminal aggregate of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Items read off the input stream, independent of later success.
    pub records_received: usize,
    /// Write operations produced by the transformer.
    pub records_transformed: usize,
    /// Documents confirmed written by the engine.
    pub succeeded: usize,
    /// Per-record and per-document failures.
    pub failed: usize,
    /// Reasons for every recorded failure.
    pub failure_reasons: Vec<DocumentFailure>,
}
