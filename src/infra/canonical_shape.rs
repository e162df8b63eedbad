use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::{Result, TelemetryError};

/// Structural JSON Schema every transformed document must satisfy.
pub const CANONICAL_RECORD_SCHEMA: &str = include_str!("../../schemas/canonical_record.v1.json");

/// Rejects transform output that is not shaped like a canonical record.
pub struct CanonicalShapeGuard {
    schema: JSONSchema,
}

impl CanonicalShapeGuard {
    pub fn new() -> Result<Self> {
        Self::from_schema_str(CANONICAL_RECORD_SCHEMA)
    }

    pub fn from_schema_str(schema: &str) -> Result<Self> {
        let schema_json: Value = serde_json::from_str(schema)?;
        let schema = JSONSchema::options()
            .compile(&schema_json)
            .map_err(|e| TelemetryError::Schema(format!("invalid schema: {}", e)))?;
        Ok(Self { schema })
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.schema.is_valid(document)
    }

    /// Check one document, or every element when it is an array.
    pub fn check(&self, document: &Value) -> Result<()> {
        match document {
            Value::Array(items) => items.iter().try_for_each(|item| self.check_one(item)),
            other => self.check_one(other),
        }
    }

    fn check_one(&self, document: &Value) -> Result<()> {
        if let Err(errors) = self.schema.validate(document) {
            let messages: Vec<String> = errors
                .map(|e| format!("{} at '{}'", e, e.instance_path))
                .collect();
            return Err(TelemetryError::Schema(messages.join("; ")));
        }
        Ok(())
    }
}
