//! Error types for the catalog indexer pipeline.

use thiserror::Error;

use catalog_indexer_shared::{FailureReason, PipelineOutcome};

/// Per-record transform failures.
///
/// These are absorbed into the run's tallies and never abort the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The record lacks its identifier field, or the field is empty.
    #[error("record is missing identifier field '{field}'")]
    MissingIdentifier {
        /// The configured id field path.
        field: String,
    },
}

impl From<TransformError> for FailureReason {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::MissingIdentifier { field } => {
                FailureReason::MissingIdentifier { field }
            }
        }
    }
}

/// Fatal pipeline errors. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A bulk call failed as a whole. The batch's operations are
    /// indeterminate: neither confirmed written nor confirmed failed.
    #[error("bulk submission of {operations} operations failed: {reason}")]
    BatchTransport {
        /// Number of operations in the failed batch.
        operations: usize,
        /// Transport-level failure reason.
        reason: String,
    },

    /// The input stream reported an error.
    #[error("Input stream error: {0}")]
    Source(String),

    /// A pipeline stage channel was closed unexpectedly.
    #[error("Channel error: {0}")]
    Channel(String),

    /// The run was cancelled before the stream completed.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// A pipeline task failed in a way that should not happen.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Create a batch transport error.
    pub fn batch_transport(operations: usize, reason: impl Into<String>) -> Self {
        Self::BatchTransport {
            operations,
            reason: reason.into(),
        }
    }

    /// Create an input stream error.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// A rejected pipeline run: the fatal error together with the partial
/// tallies gathered before the abort.
///
/// Callers always receive either a completed [`PipelineOutcome`] or this
/// envelope; a partial outcome is never disguised as success.
#[derive(Error, Debug)]
#[error("pipeline aborted: {error}")]
pub struct PipelineAbort {
    /// Counts accumulated up to the abort.
    pub outcome: PipelineOutcome,
    /// The error that ended the run.
    #[source]
    pub error: PipelineError,
}
