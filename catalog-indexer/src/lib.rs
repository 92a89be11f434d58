//! Entry-point library for the catalog indexer binary.
//!
//! Ties together the shared OpenSearch connection, index setup, and the
//! streaming pipeline. The binary feeds it newline-delimited JSON catalog
//! records on stdin; everything else is wired from environment variables
//! in [`config::Dependencies`].

pub mod config;

pub use config::Dependencies;

use thiserror::Error;

/// Top-level failure of an indexer invocation.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Bad or missing environment configuration, or the engine was
    /// unreachable at startup.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The indexing run aborted.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] catalog_indexer_pipeline::PipelineError),

    /// An engine call outside the pipeline failed, such as index setup.
    #[error("Search error: {0}")]
    SearchError(#[from] catalog_indexer_repository::SearchError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
