//! # Catalog Indexer Shared
//!
//! Shared data types for the catalog indexer system: write operations,
//! bulk results, pipeline outcomes, and search request/response shapes.

mod search;
mod types;

pub use search::{PageProperties, SearchPage, SearchRequest, DEFAULT_PAGE_SIZE};
pub use types::{
    BatchResult, DocumentFailure, DocumentOutcome, DocumentResult, FailureReason,
    PipelineOutcome, Record, WriteAction, WriteOperation,
};
