//! # Catalog Indexer Repository
//!
//! This crate provides the interface to the document-search engine. It
//! includes the abstract `SearchEngineClient` trait, error types, a
//! concrete OpenSearch implementation, and the process-wide shared
//! connection handle.

pub mod connection;
pub mod errors;
pub mod interfaces;
pub mod opensearch;

pub use connection::{close_shared_client, shared_client};
pub use errors::SearchError;
pub use interfaces::SearchEngineClient;
pub use opensearch::OpenSearchClient;
