//! Pipeline coordinator.
//!
//! Drives a single end-to-end run: reads the input stream, transforms each
//! record, feeds the batching writer, and resolves the terminal outcome.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use crate::errors::{PipelineAbort, PipelineError};
use crate::transformer::{RecordTransformer, DEFAULT_CONFLICT_RETRIES, DEFAULT_ID_FIELD};
use crate::writer::{BatchingWriter, WriterConfig};
use catalog_indexer_repository::SearchEngineClient;
use catalog_indexer_shared::{DocumentFailure, PipelineOutcome, Record};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Identifier field path within each record.
    pub id_field: String,
    /// Engine-side conflict-retry budget per write.
    pub conflict_retries: u32,
    /// Batching writer configuration.
    pub writer: WriterConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            writer: WriterConfig::default(),
        }
    }
}

/// Coordinator for one streaming indexing run.
///
/// Owns no state between runs; every invocation spawns a fresh writer and
/// returns a fresh [`PipelineOutcome`].
pub struct PipelineCoordinator {
    client: Arc<dyn SearchEngineClient>,
    config: CoordinatorConfig,
}

impl PipelineCoordinator {
    /// Create a coordinator with default configuration.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self {
            client,
            config: CoordinatorConfig::default(),
        }
    }

    /// Create a coordinator with custom configuration.
    pub fn with_config(client: Arc<dyn SearchEngineClient>, config: CoordinatorConfig) -> Self {
        Self { client, config }
    }

    /// Run the pipeline over an input stream until end-of-data.
    ///
    /// Returns the completed outcome, or [`PipelineAbort`] with partial
    /// tallies when a fatal error ends the run early.
    pub async fn run<S>(
        &self,
        records: S,
        collection: &str,
    ) -> Result<PipelineOutcome, PipelineAbort>
    where
        S: Stream<Item = Result<Record, PipelineError>> + Send,
    {
        // Held so the shutdown receiver stays silent for the whole run.
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        self.run_with_shutdown(records, collection, shutdown_rx)
            .await
    }

    /// Run the pipeline, aborting early when the shutdown signal fires.
    ///
    /// On shutdown the coordinator stops reading input; operations already
    /// handed to the writer are flushed and in-flight batches settle
    /// (bounded by the submission timeout) before the partial outcome is
    /// returned.
    #[instrument(skip(self, records, shutdown), fields(collection = %collection))]
    pub async fn run_with_shutdown<S>(
        &self,
        records: S,
        collection: &str,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<PipelineOutcome, PipelineAbort>
    where
        S: Stream<Item = Result<Record, PipelineError>> + Send,
    {
        let transformer = RecordTransformer::new()
            .with_id_field(&self.config.id_field)
            .with_conflict_retries(self.config.conflict_retries);
        let writer = BatchingWriter::spawn(Arc::clone(&self.client), self.config.writer.clone());

        let mut received = 0usize;
        let mut transformed = 0usize;
        let mut record_failures: Vec<DocumentFailure> = Vec::new();
        let mut fatal: Option<PipelineError> = None;

        futures::pin_mut!(records);

        loop {
            tokio::select! {
                item = records.next() => match item {
                    None => break,
                    Some(Ok(record)) => {
                        received += 1;
                        match transformer.transform(collection, record) {
                            Ok(op) => {
                                transformed += 1;
                                // A refused operation means the writer has
                                // aborted; finish() reports the cause.
                                if writer.accept(op).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Record failed to transform, continuing");
                                record_failures.push(DocumentFailure {
                                    document_id: None,
                                    reason: e.into(),
                                });
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Input stream failed");
                        fatal = Some(e);
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    info!("Pipeline received shutdown signal");
                    fatal = Some(PipelineError::Cancelled);
                    break;
                }
            }
        }

        let (tally, writer_error) = match writer.finish().await {
            Ok(tally) => (tally, None),
            Err(aborted) => (aborted.tally, Some(aborted.error)),
        };

        let mut outcome = PipelineOutcome {
            records_received: received,
            records_transformed: transformed,
            succeeded: tally.succeeded,
            failed: tally.failed + record_failures.len(),
            failure_reasons: record_failures,
        };
        outcome.failure_reasons.extend(tally.failure_reasons);

        match writer_error.or(fatal) {
            None => {
                info!(
                    received = outcome.records_received,
                    transformed = outcome.records_transformed,
                    succeeded = outcome.succeeded,
                    failed = outcome.failed,
                    "Pipeline run complete"
                );
                Ok(outcome)
            }
            Some(error) => Err(PipelineAbort { outcome, error }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;
    use catalog_indexer_shared::FailureReason;
    use futures::stream;
    use serde_json::json;

    fn record(id: usize) -> Record {
        json!({"properties": {"id": format!("scene-{}", id), "eo:cloud_cover": id}})
    }

    fn ok_stream(n: usize) -> impl Stream<Item = Result<Record, PipelineError>> {
        stream::iter((0..n).map(|i| Ok(record(i))))
    }

    fn config(max_batch_size: usize) -> CoordinatorConfig {
        CoordinatorConfig {
            writer: WriterConfig {
                max_batch_size,
                ..WriterConfig::default()
            },
            ..CoordinatorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_counts_conserved_on_clean_run() {
        let engine = Arc::new(MockEngine::new());
        let coordinator = PipelineCoordinator::with_config(engine.clone(), config(10));

        let outcome = coordinator.run(ok_stream(25), "catalog").await.unwrap();

        assert_eq!(outcome.records_received, 25);
        assert_eq!(outcome.records_transformed, 25);
        assert_eq!(outcome.succeeded + outcome.failed, 25);
        assert_eq!(outcome.failed, 0);

        // ceil(25 / 10) submissions.
        let mut sizes = engine.batch_sizes();
        sizes.sort();
        assert_eq!(sizes, vec![5, 10, 10]);
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_poison_stream() {
        let engine = Arc::new(MockEngine::new());
        let coordinator = PipelineCoordinator::new(engine.clone());

        let records = vec![
            Ok(record(0)),
            Ok(record(1)),
            Ok(json!({"properties": {"datetime": "2018-02-12T00:00:00Z"}})),
            Ok(record(3)),
            Ok(record(4)),
        ];

        let outcome = coordinator
            .run(stream::iter(records), "catalog")
            .await
            .unwrap();

        assert_eq!(outcome.records_received, 5);
        assert_eq!(outcome.records_transformed, 4);
        assert_eq!(outcome.succeeded, 4);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failure_reasons.len(), 1);
        assert!(matches!(
            outcome.failure_reasons[0].reason,
            FailureReason::MissingIdentifier { .. }
        ));
    }

    #[tokio::test]
    async fn test_stream_error_aborts_with_partial_outcome() {
        let engine = Arc::new(MockEngine::new());
        let coordinator = PipelineCoordinator::new(engine.clone());

        let records = vec![
            Ok(record(0)),
            Ok(record(1)),
            Err(PipelineError::source("upstream connection reset")),
        ];

        let abort = coordinator
            .run(stream::iter(records), "catalog")
            .await
            .unwrap_err();

        assert_eq!(abort.outcome.records_received, 2);
        assert_eq!(abort.outcome.records_transformed, 2);
        // The writer still flushed what it was handed.
        assert_eq!(abort.outcome.succeeded, 2);
        assert!(matches!(abort.error, PipelineError::Source(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_run() {
        let engine = Arc::new(MockEngine::new().failing_on_call(2));
        let coordinator = PipelineCoordinator::with_config(
            engine.clone(),
            CoordinatorConfig {
                writer: WriterConfig {
                    submission_concurrency: 1,
                    ..WriterConfig::default()
                },
                ..CoordinatorConfig::default()
            },
        );

        let abort = coordinator.run(ok_stream(250), "catalog").await.unwrap_err();

        // Only the first batch was confirmed before the abort.
        assert_eq!(abort.outcome.succeeded, 100);
        assert_eq!(abort.outcome.failed, 0);
        // Reading may have been paused by backpressure when the failure
        // landed, but everything counted was also transformed.
        assert!(abort.outcome.records_received >= 200);
        assert!(abort.outcome.records_received <= 250);
        assert_eq!(
            abort.outcome.records_transformed,
            abort.outcome.records_received
        );
        assert!(matches!(
            abort.error,
            PipelineError::BatchTransport { operations: 100, .. }
        ));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_run() {
        let engine = Arc::new(MockEngine::new());
        let coordinator = PipelineCoordinator::new(engine.clone());

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        shutdown_tx.send(()).unwrap();

        // A stream that never ends: only the shutdown signal can stop it.
        let abort = coordinator
            .run_with_shutdown(stream::pending(), "catalog", shutdown_rx)
            .await
            .unwrap_err();

        assert!(matches!(abort.error, PipelineError::Cancelled));
        assert_eq!(abort.outcome.records_received, 0);
        assert_eq!(abort.outcome.succeeded, 0);
    }

    #[tokio::test]
    async fn test_per_document_rejection_in_outcome() {
        let engine = Arc::new(MockEngine::new().rejecting(&["scene-1"]));
        let coordinator = PipelineCoordinator::new(engine.clone());

        let outcome = coordinator.run(ok_stream(3), "catalog").await.unwrap();

        assert_eq!(outcome.records_received, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(
            outcome.failure_reasons[0].document_id,
            Some("scene-1".to_string())
        );
        assert!(matches!(
            outcome.failure_reasons[0].reason,
            FailureReason::DocumentWrite { .. }
        ));
    }
}
