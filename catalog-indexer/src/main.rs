//! Catalog indexer entry point.
//!
//! Reads newline-delimited JSON catalog records from stdin and streams them
//! into the search engine, reporting the run outcome on exit.

use futures::StreamExt;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio_stream::wrappers::LinesStream;
use tracing::{error, info, warn};

use catalog_indexer::{Dependencies, IndexingError};
use catalog_indexer_pipeline::PipelineError;
use catalog_indexer_repository::close_shared_client;
use catalog_indexer_shared::Record;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Indexer run failed");
            1
        }
    };

    close_shared_client().await;
    std::process::exit(exit_code);
}

async fn run() -> Result<(), IndexingError> {
    let deps = Dependencies::new().await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(());
        }
    });

    let records = LinesStream::new(BufReader::new(stdin()).lines()).filter_map(|line| async {
        match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => match serde_json::from_str::<Record>(&line) {
                Ok(record) => Some(Ok(record)),
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable input line");
                    None
                }
            },
            Err(e) => Some(Err(PipelineError::source(format!(
                "stdin read failed: {}",
                e
            )))),
        }
    });

    info!(index = %deps.index, "Starting catalog indexing run");

    match deps
        .coordinator
        .run_with_shutdown(records, &deps.index, shutdown_rx)
        .await
    {
        Ok(outcome) => {
            info!(
                received = outcome.records_received,
                transformed = outcome.records_transformed,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "Indexing run finished"
            );
            Ok(())
        }
        Err(abort) => {
            error!(
                received = abort.outcome.records_received,
                succeeded = abort.outcome.succeeded,
                failed = abort.outcome.failed,
                "Indexing run aborted"
            );
            Err(abort.error.into())
        }
    }
}
