//! Batching writer.
//!
//! Groups incoming write operations into bounded batches and submits them
//! to the search engine's bulk API with bounded concurrency. The writer
//! runs as its own task behind a bounded channel: a full channel is the
//! backpressure signal that suspends the producer.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::errors::PipelineError;
use catalog_indexer_repository::SearchEngineClient;
use catalog_indexer_shared::{BatchResult, DocumentFailure, WriteOperation};

/// Configuration for the batching writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum operations per batch.
    pub max_batch_size: usize,
    /// Maximum time a batch may stay open after its first operation.
    pub max_batch_wait: Duration,
    /// Maximum concurrently in-flight bulk submissions.
    pub submission_concurrency: usize,
    /// Capacity of the queue between `accept` and the writer. The writer
    /// also holds its open batch, so unsubmitted operations can reach
    /// about this plus `max_batch_size` before the producer suspends.
    pub high_water_mark: usize,
    /// Bounded wait for one bulk submission's acknowledgment.
    pub submission_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            max_batch_wait: Duration::from_millis(1000),
            submission_concurrency: 4,
            high_water_mark: 100,
            submission_timeout: Duration::from_secs(120),
        }
    }
}

/// Aggregate of every acknowledged batch in one writer run.
///
/// Acknowledgments may arrive out of submission order; the tally is
/// aggregated per batch identity as each one lands.
#[derive(Debug, Clone, Default)]
pub struct WriteTally {
    /// Documents confirmed written.
    pub succeeded: usize,
    /// Documents rejected by the engine.
    pub failed: usize,
    /// Acknowledged batches.
    pub batches: usize,
    /// Reasons for every rejected document.
    pub failure_reasons: Vec<DocumentFailure>,
}

impl WriteTally {
    fn absorb(&mut self, result: BatchResult) {
        debug!(
            batch_id = result.batch_id,
            succeeded = result.succeeded,
            failed = result.failed,
            "Batch acknowledged"
        );
        self.batches += 1;
        self.succeeded += result.succeeded;
        self.failed += result.failed;
        self.failure_reasons.extend(result.failure_reasons);
    }
}

/// A writer run ended by a fatal error, carrying the tallies confirmed
/// before the abort.
#[derive(Error, Debug)]
#[error("batching writer aborted: {error}")]
pub struct WriterAborted {
    /// Tallies from batches acknowledged before the abort.
    pub tally: WriteTally,
    /// The fatal error.
    #[source]
    pub error: PipelineError,
}

/// Handle to a running batching writer task.
pub struct BatchingWriter {
    tx: mpsc::Sender<WriteOperation>,
    task: tokio::task::JoinHandle<Result<WriteTally, WriterAborted>>,
}

impl BatchingWriter {
    /// Spawn a writer task against the given engine client.
    pub fn spawn(client: Arc<dyn SearchEngineClient>, config: WriterConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.high_water_mark.max(1));
        let task = tokio::spawn(write_loop(client, config, rx));
        Self { tx, task }
    }

    /// Hand one operation to the writer.
    ///
    /// Suspends while the pending queue is at its high-water mark. Returns
    /// an error when the writer has aborted and no longer accepts input;
    /// the abort cause is reported by [`finish`](Self::finish).
    pub async fn accept(&self, op: WriteOperation) -> Result<(), PipelineError> {
        self.tx.send(op).await.map_err(|_| {
            PipelineError::channel("batching writer is no longer accepting operations")
        })
    }

    /// Close the input, flush the final partial batch, and wait for every
    /// in-flight submission to settle.
    pub async fn finish(self) -> Result<WriteTally, WriterAborted> {
        drop(self.tx);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(WriterAborted {
                tally: WriteTally::default(),
                error: PipelineError::internal(format!("writer task panicked: {}", e)),
            }),
        }
    }
}

/// The writer task.
///
/// A batch closes when it reaches `max_batch_size` or `max_batch_wait`
/// after its first operation, whichever comes first; a batch is never
/// submitted empty. A closed batch is staged until a concurrency permit is
/// free; while one is staged the loop stops consuming the channel, so
/// saturation propagates to the producer through the bounded channel. The
/// select is biased towards completed submissions: a fatal error is always
/// observed before a staged batch is spawned or new work is created. On a
/// fatal error the channel is closed (stopping the producer), unsubmitted
/// operations are discarded, and in-flight submissions are drained before
/// reporting. On channel close the remaining partial batch is flushed once
/// every earlier submission has settled.
async fn write_loop(
    client: Arc<dyn SearchEngineClient>,
    config: WriterConfig,
    mut rx: mpsc::Receiver<WriteOperation>,
) -> Result<WriteTally, WriterAborted> {
    let limiter = Arc::new(Semaphore::new(config.submission_concurrency.max(1)));
    let mut in_flight: JoinSet<Result<BatchResult, PipelineError>> = JoinSet::new();
    let mut buffer: Vec<WriteOperation> = Vec::with_capacity(config.max_batch_size);
    let mut staged: Option<Vec<WriteOperation>> = None;
    let mut deadline: Option<Instant> = None;
    let mut next_batch_id: u64 = 0;
    let mut tally = WriteTally::default();
    let mut fatal: Option<PipelineError> = None;
    let mut open = true;

    loop {
        if in_flight.is_empty() && staged.is_none() {
            if fatal.is_some() {
                break;
            }
            if !open {
                if buffer.is_empty() {
                    break;
                }
                // Final flush: all earlier submissions have settled.
                staged = Some(std::mem::take(&mut buffer));
            }
        }

        tokio::select! {
            biased;

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                let failure = match joined {
                    Ok(Ok(result)) => {
                        tally.absorb(result);
                        None
                    }
                    Ok(Err(e)) => Some(e),
                    Err(e) => Some(PipelineError::internal(format!(
                        "submission task panicked: {}", e
                    ))),
                };

                if let Some(e) = failure {
                    if fatal.is_none() {
                        error!(error = %e, "Batch submission failed, aborting writer");
                        rx.close();
                        open = false;
                        buffer.clear();
                        staged = None;
                        deadline = None;
                        fatal = Some(e);
                    }
                }
            }

            Ok(permit) = Arc::clone(&limiter).acquire_owned(), if staged.is_some() => {
                if let Some(batch) = staged.take() {
                    submit_batch(
                        &client, &mut in_flight, &config, next_batch_id, permit, batch,
                    );
                    next_batch_id += 1;
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                debug!(size = buffer.len(), "Max batch wait elapsed, flushing partial batch");
                deadline = None;
                staged = Some(std::mem::replace(
                    &mut buffer,
                    Vec::with_capacity(config.max_batch_size),
                ));
            }

            op = rx.recv(), if open && staged.is_none() => {
                match op {
                    Some(op) => {
                        if buffer.is_empty() {
                            deadline = Some(Instant::now() + config.max_batch_wait);
                        }
                        buffer.push(op);
                        if buffer.len() >= config.max_batch_size {
                            deadline = None;
                            staged = Some(std::mem::replace(
                                &mut buffer,
                                Vec::with_capacity(config.max_batch_size),
                            ));
                        }
                    }
                    None => {
                        open = false;
                        deadline = None;
                    }
                }
            }
        }
    }

    match fatal {
        None => {
            info!(
                batches = tally.batches,
                succeeded = tally.succeeded,
                failed = tally.failed,
                "Writer finished"
            );
            Ok(tally)
        }
        Some(error) => Err(WriterAborted { tally, error }),
    }
}

/// Spawn one bulk submission holding its concurrency permit.
fn submit_batch(
    client: &Arc<dyn SearchEngineClient>,
    in_flight: &mut JoinSet<Result<BatchResult, PipelineError>>,
    config: &WriterConfig,
    batch_id: u64,
    permit: tokio::sync::OwnedSemaphorePermit,
    operations: Vec<WriteOperation>,
) {
    debug!(batch_id, size = operations.len(), "Submitting batch");

    let client = Arc::clone(client);
    let timeout = config.submission_timeout;

    in_flight.spawn(async move {
        let _permit = permit;
        let sent = operations.len();

        let results = match tokio::time::timeout(timeout, client.bulk_write(&operations)).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => return Err(PipelineError::batch_transport(sent, e.to_string())),
            Err(_) => {
                return Err(PipelineError::batch_transport(
                    sent,
                    format!("no acknowledgment within {:?}", timeout),
                ))
            }
        };

        if results.len() != sent {
            warn!(
                batch_id,
                sent,
                acknowledged = results.len(),
                "Bulk acknowledgment count mismatch"
            );
        }

        Ok(BatchResult::classify(batch_id, &operations, &results))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;
    use catalog_indexer_shared::{FailureReason, WriteAction};
    use serde_json::json;

    fn op(id: usize) -> WriteOperation {
        WriteOperation {
            collection: "catalog".to_string(),
            document_id: format!("doc-{}", id),
            action: WriteAction::Upsert,
            retry_on_conflict: 3,
            body: json!({"properties": {"id": format!("doc-{}", id)}}),
        }
    }

    fn small_config(max_batch_size: usize) -> WriterConfig {
        WriterConfig {
            max_batch_size,
            ..WriterConfig::default()
        }
    }

    #[tokio::test]
    async fn test_splits_into_full_batches() {
        let engine = Arc::new(MockEngine::new());
        let writer = BatchingWriter::spawn(engine.clone(), small_config(10));

        for i in 0..25 {
            writer.accept(op(i)).await.unwrap();
        }
        let tally = writer.finish().await.unwrap();

        assert_eq!(tally.succeeded, 25);
        assert_eq!(tally.failed, 0);
        assert_eq!(tally.batches, 3);

        let mut sizes = engine.batch_sizes();
        sizes.sort();
        assert_eq!(sizes, vec![5, 10, 10]);
    }

    #[tokio::test]
    async fn test_ceil_of_n_over_b_submissions() {
        let engine = Arc::new(MockEngine::new());
        let writer = BatchingWriter::spawn(engine.clone(), WriterConfig::default());

        for i in 0..250 {
            writer.accept(op(i)).await.unwrap();
        }
        let tally = writer.finish().await.unwrap();

        assert_eq!(tally.succeeded, 250);
        assert_eq!(tally.batches, 3);

        let mut sizes = engine.batch_sizes();
        sizes.sort();
        assert_eq!(sizes, vec![50, 100, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_batch_flushed_on_wait_timeout() {
        let engine = Arc::new(MockEngine::new());
        let writer = BatchingWriter::spawn(engine.clone(), WriterConfig::default());

        for i in 0..3 {
            writer.accept(op(i)).await.unwrap();
        }

        // Well past max_batch_wait; the partial batch must go out without
        // waiting for a full one.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(engine.batch_sizes(), vec![3]);

        let tally = writer.finish().await.unwrap();
        assert_eq!(tally.succeeded, 3);
        assert_eq!(tally.batches, 1);
    }

    #[tokio::test]
    async fn test_never_flushes_empty() {
        let engine = Arc::new(MockEngine::new());
        let writer = BatchingWriter::spawn(engine.clone(), WriterConfig::default());

        let tally = writer.finish().await.unwrap();

        assert_eq!(tally.batches, 0);
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_final_partial_batch_flushed_on_close() {
        let engine = Arc::new(MockEngine::new());
        let writer = BatchingWriter::spawn(engine.clone(), WriterConfig::default());

        for i in 0..5 {
            writer.accept(op(i)).await.unwrap();
        }
        let tally = writer.finish().await.unwrap();

        assert_eq!(tally.succeeded, 5);
        assert_eq!(engine.batch_sizes(), vec![5]);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_with_partial_tally() {
        let engine = Arc::new(MockEngine::new().failing_on_call(2));
        let config = WriterConfig {
            submission_concurrency: 1,
            ..WriterConfig::default()
        };
        let writer = BatchingWriter::spawn(engine.clone(), config);

        for i in 0..250 {
            if writer.accept(op(i)).await.is_err() {
                break;
            }
        }
        let aborted = writer.finish().await.unwrap_err();

        // Only the first batch was confirmed; the third was never
        // submitted because the failure was observed first.
        assert_eq!(aborted.tally.succeeded, 100);
        assert_eq!(aborted.tally.failed, 0);
        assert_eq!(aborted.tally.batches, 1);
        assert_eq!(engine.batch_sizes(), vec![100]);
        assert!(matches!(
            aborted.error,
            PipelineError::BatchTransport { operations: 100, .. }
        ));
    }

    #[tokio::test]
    async fn test_per_document_rejections_counted() {
        let engine = Arc::new(MockEngine::new().rejecting(&["doc-1", "doc-3"]));
        let writer = BatchingWriter::spawn(engine.clone(), WriterConfig::default());

        for i in 0..5 {
            writer.accept(op(i)).await.unwrap();
        }
        let tally = writer.finish().await.unwrap();

        assert_eq!(tally.succeeded, 3);
        assert_eq!(tally.failed, 2);
        assert_eq!(tally.failure_reasons.len(), 2);
        assert!(tally.failure_reasons.iter().all(|f| matches!(
            f.reason,
            FailureReason::DocumentWrite { .. }
        )));
        let rejected: Vec<_> = tally
            .failure_reasons
            .iter()
            .filter_map(|f| f.document_id.as_deref())
            .collect();
        assert_eq!(rejected, vec!["doc-1", "doc-3"]);
    }
}
