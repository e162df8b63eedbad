use std::sync::Arc;
use tracing::debug;

use crate::app::ports::AnomalySink;
use crate::error::Result;
use crate::pipeline::processing::dedup::{Admission, DedupTracker};
use crate::pipeline::processing::quality_gate::RangeValidator;
use crate::pipeline::processing::record::Record;

/// Counters for one processor's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub processed: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub anomalies: usize,
    pub corrected_fields: usize,
}

/// Sequential cleaner for one stream of inverter readings.
///
/// Holds the seen-set and the previously accepted reading. Both depend on the
/// order records are offered in, so one instance must only ever be fed from a
/// single thread of control; independent streams get independent instances.
pub struct InverterStreamProcessor {
    dedup: DedupTracker,
    validator: RangeValidator,
    anomalies: Arc<dyn AnomalySink>,
    previous: Option<Record>,
    stats: ProcessorStats,
}

impl InverterStreamProcessor {
    pub fn new(validator: RangeValidator, anomalies: Arc<dyn AnomalySink>) -> Self {
        Self {
            dedup: DedupTracker::new(),
            validator,
            anomalies,
            previous: None,
            stats: ProcessorStats::default(),
        }
    }

    /// Clean one record.
    ///
    /// Invalid and duplicate records come back exactly as received and leave the
    /// previous-record slot alone. Admitted records are range-corrected against
    /// the previous one, stripped of legacy anomaly keys and become the new
    /// previous record. Fails only when the anomaly log cannot be written.
    pub fn process(&mut self, record: Record) -> Result<Record> {
        match self.dedup.admit(&record, self.anomalies.as_ref())? {
            Admission::Admitted(_) => {}
            Admission::MissingIdentity => {
                self.stats.invalid += 1;
                crate::metrics::processor::record_rejected("missing_identity");
                return Ok(record);
            }
            Admission::Duplicate(_) => {
                self.stats.duplicates += 1;
                crate::metrics::processor::record_rejected("duplicate");
                return Ok(record);
            }
        }

        let validated = self.validator.validate_record(record, self.previous.as_ref());
        let mut record = validated.record;

        self.anomalies.log(&record.log_identity(), &validated.anomalies)?;

        if record.strip_anomaly_metadata() {
            debug!(record = %record.log_identity(), "stripped legacy anomaly metadata");
        }

        self.stats.processed += 1;
        self.stats.anomalies += validated.anomalies.len();
        self.stats.corrected_fields += validated.corrected_fields;
        crate::metrics::processor::record_processed(validated.anomalies.len(), validated.corrected_fields);

        self.previous = Some(record.clone());
        Ok(record)
    }

    /// Clean records in order. Output has the same length and order as input;
    /// rejected records stay in place unmodified.
    pub fn process_stream(&mut self, records: Vec<Record>) -> Result<Vec<Record>> {
        records.into_iter().map(|record| self.process(record)).collect()
    }

    pub fn previous(&self) -> Option<&Record> {
        self.previous.as_ref()
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }
}
