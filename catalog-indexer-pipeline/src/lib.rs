//! Streaming and bulk indexing pipeline for catalog records.
//!
//! The coordinator reads a record stream, the transformer turns each record
//! into an upsert write operation, and the batching writer groups operations
//! into bounded bulk submissions against the search engine.

pub mod coordinator;
pub mod errors;
pub mod save;
pub mod transformer;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{CoordinatorConfig, PipelineCoordinator};
pub use errors::{PipelineAbort, PipelineError, TransformError};
pub use save::{save_records, SaveSummary};
pub use transformer::{RecordTransformer, DEFAULT_CONFLICT_RETRIES, DEFAULT_ID_FIELD};
pub use writer::{BatchingWriter, WriteTally, WriterAborted, WriterConfig};
