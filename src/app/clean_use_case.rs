use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::ports::AnomalySink;
use crate::constants::CLEANED_FILE_PREFIX;
use crate::error::Result;
use crate::pipeline::json_files::{file_name, list_json_files, load_records, write_records};
use crate::pipeline::processing::quality_gate::RangeValidator;
use crate::pipeline::processing::stream_processor::InverterStreamProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Success,
    Failed,
}

/// Result of cleaning one input file.
#[derive(Debug, Clone, Serialize)]
pub struct CleanedFile {
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one folder-cleaning run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<CleanedFile>,
    pub records_processed: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub anomalies: usize,
    pub corrected_fields: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.status == FileStatus::Success).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.status == FileStatus::Failed).count()
    }

    fn failure(&mut self, file: String, error: String) {
        self.files.push(CleanedFile {
            file,
            status: FileStatus::Failed,
            output_file: None,
            records: 0,
            error: Some(error),
        });
    }
}

/// Cleans every JSON file of a folder through one stream processor.
#[derive(Clone)]
pub struct CleanUseCase {
    validator: RangeValidator,
    anomalies: Arc<dyn AnomalySink>,
}

impl CleanUseCase {
    pub fn new(validator: RangeValidator, anomalies: Arc<dyn AnomalySink>) -> Self {
        Self { validator, anomalies }
    }

    /// Clean `input_dir/*.json` into `output_dir/cleaned_<name>`.
    ///
    /// One processor spans the whole folder, so duplicates are caught across
    /// files and the previous reading carries over from one file to the next
    /// (files are visited in name order). A file that cannot be read, parsed
    /// or written is reported and skipped. Only an anomaly-log failure aborts.
    pub fn clean_folder(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
        fs::create_dir_all(output_dir)?;
        let inputs = list_json_files(input_dir)?;
        info!("🧹 Cleaning {} file(s) from {}", inputs.len(), input_dir.display());

        let mut processor = InverterStreamProcessor::new(self.validator.clone(), self.anomalies.clone());
        let mut report = BatchReport::default();

        for input in inputs {
            let name = file_name(&input);

            let records = match load_records(&input) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Error reading {}: {}", name, e);
                    crate::metrics::batch::file_failed("read");
                    report.failure(name, e.to_string());
                    continue;
                }
            };

            let count = records.len();
            let cleaned = processor.process_stream(records)?;

            let output_path = output_dir.join(format!("{}{}", CLEANED_FILE_PREFIX, name));
            if let Err(e) = write_records(&output_path, cleaned) {
                error!("Failed writing {}: {}", output_path.display(), e);
                crate::metrics::batch::file_failed("write");
                report.failure(name, e.to_string());
                continue;
            }

            info!("✅ Processed {} -> {}", name, output_path.display());
            crate::metrics::batch::file_cleaned(count);
            report.files.push(CleanedFile {
                file: name,
                status: FileStatus::Success,
                output_file: Some(output_path.display().to_string()),
                records: count,
                error: None,
            });
        }

        let stats = processor.stats();
        report.records_processed = stats.processed;
        report.duplicates = stats.duplicates;
        report.invalid = stats.invalid;
        report.anomalies = stats.anomalies;
        report.corrected_fields = stats.corrected_fields;

        info!(
            "Cleaning finished: {} succeeded, {} failed, {} records processed, {} anomalies",
            report.succeeded(),
            report.failed(),
            report.records_processed,
            report.anomalies
        );
        Ok(report)
    }
}
