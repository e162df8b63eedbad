//! Pipeline metrics.
//!
//! Each phase records through its own submodule so names stay in one place. The
//! Prometheus recorder is installed once; until then every call is a no-op.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Idempotent.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus recorder installed");
            let _ = HANDLE.set(handle.clone());
            Some(handle)
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Render the current metrics in Prometheus text format.
pub fn render() -> String {
    HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}

pub mod processor {
    pub fn record_processed(anomalies: usize, corrected_fields: usize) {
        ::metrics::counter!("telemetry_records_processed_total").increment(1);
        ::metrics::counter!("telemetry_anomalies_total").increment(anomalies as u64);
        ::metrics::counter!("telemetry_fields_corrected_total").increment(corrected_fields as u64);
    }

    pub fn record_rejected(reason: &'static str) {
        ::metrics::counter!("telemetry_records_rejected_total", "reason" => reason).increment(1);
    }
}

pub mod batch {
    pub fn file_cleaned(records: usize) {
        ::metrics::counter!("telemetry_files_cleaned_total").increment(1);
        ::metrics::histogram!("telemetry_records_per_file").record(records as f64);
    }

    pub fn file_failed(phase: &'static str) {
        ::metrics::counter!("telemetry_files_failed_total", "phase" => phase).increment(1);
    }
}

pub mod transform {
    pub fn file_transformed(duration_secs: f64) {
        ::metrics::counter!("telemetry_transform_success_total").increment(1);
        ::metrics::histogram!("telemetry_transform_duration_seconds").record(duration_secs);
    }

    pub fn file_failed() {
        ::metrics::counter!("telemetry_transform_failed_total").increment(1);
    }
}

pub mod store {
    use crate::app::ports::InsertOutcome;

    pub fn insert_outcome(outcome: InsertOutcome) {
        let label = match outcome {
            InsertOutcome::Inserted => "inserted",
            InsertOutcome::DuplicateSkipped => "duplicate",
            InsertOutcome::MissingIdentity => "missing_identity",
        };
        ::metrics::counter!("telemetry_store_records_total", "outcome" => label).increment(1);
    }

    pub fn insert_error() {
        ::metrics::counter!("telemetry_store_errors_total").increment(1);
    }
}
