use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::pipeline::processing::record::Record;

/// Out-of-band audit trail for data-quality notes.
///
/// Implementations append; they never rewrite what was logged before. A write
/// failure is returned as an error and must not be swallowed.
pub trait AnomalySink: Send + Sync {
    fn log(&self, record_identity: &str, messages: &[String]) -> Result<()>;
}

/// Maps a vendor document onto the canonical schema.
#[async_trait]
pub trait SchemaTransformer: Send + Sync {
    async fn transform(&self, schema: &Value, input: &Value) -> Result<Value>;
}

/// What happened to a record handed to a [`ReadingStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A reading with the same `(readingId, timestamp)` is already stored.
    DuplicateSkipped,
    /// readingId or timestamp is missing; nothing was written.
    MissingIdentity,
}

/// Durable sink for cleaned readings, unique on `(readingId, timestamp)`.
pub trait ReadingStore: Send + Sync {
    fn insert(&self, record: &Record) -> Result<InsertOutcome>;
}
