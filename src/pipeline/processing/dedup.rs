use std::collections::HashSet;
use tracing::debug;

use crate::app::ports::AnomalySink;
use crate::constants::UNKNOWN_IDENTITY;
use crate::error::Result;
use crate::pipeline::processing::record::{ReadingKey, Record};

pub const MISSING_IDENTITY_MESSAGE: &str =
    "Invalid reading: missing readingId, inverterId, or timestamp";
pub const DUPLICATE_MESSAGE: &str = "Duplicate reading, skipped";

/// Verdict of the dedup tracker for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted(ReadingKey),
    MissingIdentity,
    Duplicate(ReadingKey),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// Remembers every `(readingId, timestamp)` admitted during one run.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<ReadingKey>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or reject `record`, logging the reason for a rejection.
    ///
    /// The seen-set only grows on admission.
    pub fn admit(&mut self, record: &Record, anomalies: &dyn AnomalySink) -> Result<Admission> {
        let identity = record.identity();

        let Some(key) = identity.key() else {
            let keyed_by = identity
                .inverter_id
                .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
            anomalies.log(&keyed_by, &[MISSING_IDENTITY_MESSAGE.to_string()])?;
            return Ok(Admission::MissingIdentity);
        };

        if self.seen.contains(&key) {
            let reading_id = identity.log_identity();
            debug!(%reading_id, timestamp = ?identity.timestamp, "duplicate reading");
            anomalies.log(&reading_id, &[DUPLICATE_MESSAGE.to_string()])?;
            return Ok(Admission::Duplicate(key));
        }

        self.seen.insert(key.clone());
        Ok(Admission::Admitted(key))
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
