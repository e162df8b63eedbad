use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::ports::{InsertOutcome, ReadingStore};
use crate::error::Result;
use crate::pipeline::json_files::{file_name, list_json_files, load_records};
use crate::pipeline::processing::record::Record;

/// Insert counts for a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub inserted: usize,
    pub duplicates: usize,
    pub missing_identity: usize,
    pub errors: usize,
}

impl StoreCounts {
    fn add(&mut self, other: StoreCounts) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.missing_identity += other.missing_identity;
        self.errors += other.errors;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub file: String,
    #[serde(flatten)]
    pub counts: StoreCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreReport {
    pub files: Vec<StoredFile>,
    pub total: StoreCounts,
}

/// Persists cleaned readings, one record at a time.
#[derive(Clone)]
pub struct StoreUseCase {
    store: Arc<dyn ReadingStore>,
}

impl StoreUseCase {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Insert every record; a failing record is counted and skipped.
    pub fn insert_records(&self, records: &[Record]) -> StoreCounts {
        let mut counts = StoreCounts::default();
        for record in records {
            match self.store.insert(record) {
                Ok(outcome) => {
                    crate::metrics::store::insert_outcome(outcome);
                    match outcome {
                        InsertOutcome::Inserted => counts.inserted += 1,
                        InsertOutcome::DuplicateSkipped => {
                            info!(record = %record.log_identity(), "Duplicate skipped");
                            counts.duplicates += 1;
                        }
                        InsertOutcome::MissingIdentity => {
                            warn!("Skipping record: missing readingId or timestamp");
                            counts.missing_identity += 1;
                        }
                    }
                }
                Err(e) => {
                    error!(record = %record.log_identity(), "Error inserting record: {}", e);
                    crate::metrics::store::insert_error();
                    counts.errors += 1;
                }
            }
        }
        counts
    }

    /// Insert every `*.json` file of `dir`. Unreadable files are reported and
    /// skipped.
    pub fn insert_folder(&self, dir: &Path) -> Result<StoreReport> {
        let mut report = StoreReport::default();
        for path in list_json_files(dir)? {
            let name = file_name(&path);
            match load_records(&path) {
                Ok(records) => {
                    let counts = self.insert_records(&records);
                    info!("{}: inserted {} records", name, counts.inserted);
                    report.total.add(counts);
                    report.files.push(StoredFile {
                        file: name,
                        counts,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("Error reading {}: {}", name, e);
                    report.files.push(StoredFile {
                        file: name,
                        counts: StoreCounts::default(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        info!("📦 Total inserted records: {}", report.total.inserted);
        Ok(report)
    }
}
