//! Record transformer.
//!
//! Pure, stateless mapping from a catalog record to a write operation.

use crate::errors::TransformError;
use catalog_indexer_shared::{Record, WriteAction, WriteOperation};

/// Default identifier field path within a record.
pub const DEFAULT_ID_FIELD: &str = "properties.id";

/// Default engine-side retry budget for concurrent-update conflicts.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Transformer that maps records to upsert write operations.
///
/// The record body is carried verbatim; the only field the transformer
/// reads is the identifier at the configured dotted path.
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    id_field: String,
    conflict_retries: u32,
}

impl RecordTransformer {
    /// Create a transformer with the default id field and conflict retries.
    pub fn new() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Set the identifier field path (dotted for nested fields).
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Set the conflict-retry budget applied to every operation.
    pub fn with_conflict_retries(mut self, conflict_retries: u32) -> Self {
        self.conflict_retries = conflict_retries;
        self
    }

    /// The configured identifier field path.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Build the write operation for one record.
    ///
    /// Fails with [`TransformError::MissingIdentifier`] when the id field
    /// is absent, empty, or not a string or number.
    pub fn transform(
        &self,
        collection: &str,
        record: Record,
    ) -> Result<WriteOperation, TransformError> {
        let document_id =
            extract_id(&record, &self.id_field).ok_or_else(|| TransformError::MissingIdentifier {
                field: self.id_field.clone(),
            })?;

        Ok(WriteOperation {
            collection: collection.to_string(),
            document_id,
            action: WriteAction::Upsert,
            retry_on_conflict: self.conflict_retries,
            body: record,
        })
    }
}

impl Default for RecordTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk a dotted path into the record and read the identifier value.
fn extract_id(record: &Record, path: &str) -> Option<String> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }

    match current {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
