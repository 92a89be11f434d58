//! Dependency initialization and wiring for the catalog indexer.

use std::env;
use std::sync::Arc;
use tracing::info;

use crate::IndexingError;
use catalog_indexer_pipeline::{CoordinatorConfig, PipelineCoordinator, DEFAULT_ID_FIELD};
use catalog_indexer_repository::{shared_client, OpenSearchClient, SearchEngineClient};

/// Default index name for catalog records.
const DEFAULT_CATALOG_INDEX: &str = "catalog";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured coordinator ready to run.
    pub coordinator: PipelineCoordinator,
    /// Shared engine client handle.
    pub client: Arc<OpenSearchClient>,
    /// Index the pipeline writes into.
    pub index: String,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `CATALOG_INDEX`: Target index name (default: catalog)
    /// - `CATALOG_ID_FIELD`: Identifier field path within records (default: properties.id)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new() -> Result<Self, IndexingError> {
        let index =
            env::var("CATALOG_INDEX").unwrap_or_else(|_| DEFAULT_CATALOG_INDEX.to_string());
        let id_field =
            env::var("CATALOG_ID_FIELD").unwrap_or_else(|_| DEFAULT_ID_FIELD.to_string());

        info!(
            index = %index,
            id_field = %id_field,
            "Initializing dependencies"
        );

        // The shared client pings the engine before it is published.
        let client = shared_client()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to connect to OpenSearch: {}", e)))?;

        info!("OpenSearch connection verified");

        // Create the target index with catalog mappings when absent.
        client.create_index(&index).await?;

        let config = CoordinatorConfig {
            id_field,
            ..CoordinatorConfig::default()
        };
        let engine: Arc<dyn SearchEngineClient> = client.clone();
        let coordinator = PipelineCoordinator::with_config(engine, config);

        Ok(Self {
            coordinator,
            client,
            index,
        })
    }
}
