use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::app::clean_use_case::{BatchReport, CleanUseCase};
use crate::app::store_use_case::{StoreReport, StoreUseCase};
use crate::app::transform_use_case::{
    load_canonical_schema, TransformResult, TransformUseCase, UploadedFile,
};
use crate::config::Config;
use crate::infra::anomaly_log_adapter::FileAnomalyLog;
use crate::infra::ollama_transformer::{OllamaTransformer, PromptTemplate};
use crate::infra::sqlite_store::SqliteReadingStore;
use crate::pipeline::processing::quality_gate::RangeValidator;

/// Everything one upload produced, phase by phase.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<TransformResult>,
    pub cleaning: BatchReport,
    pub storage: StoreReport,
}

/// Transform → clean → store, over the configured folders.
pub struct TelemetryPipeline {
    transform: TransformUseCase,
    clean: CleanUseCase,
    store: StoreUseCase,
    cleaned_dir: PathBuf,
}

impl TelemetryPipeline {
    pub fn new(
        transform: TransformUseCase,
        clean: CleanUseCase,
        store: StoreUseCase,
        cleaned_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transform,
            clean,
            store,
            cleaned_dir: cleaned_dir.into(),
        }
    }

    /// Wire the production adapters described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.ensure_dirs()?;

        let prompt = PromptTemplate::load(&config.prompt_path)?;
        let transformer = OllamaTransformer::new(&config.ollama_url, &config.model_name, prompt)?;
        let schema = load_canonical_schema(&config.canonical_path)?;
        let transform = TransformUseCase::new(Box::new(transformer), schema, &config.output_dir)?;

        let anomalies = FileAnomalyLog::open(&config.anomaly_log_path)?;
        let clean = CleanUseCase::new(RangeValidator::new(config.range_table()?), Arc::new(anomalies));

        let store = SqliteReadingStore::open(&config.store_path, &config.collection_name)
            .with_context(|| format!("opening reading store {}", config.store_path.display()))?;
        let store = StoreUseCase::new(Arc::new(store));

        Ok(Self::new(transform, clean, store, &config.cleaned_dir))
    }

    /// Run the three phases for one batch of uploads.
    ///
    /// Per-file problems end up in the report. An error means a phase could
    /// not run at all (for example the anomaly log is unwritable).
    pub async fn run(&self, files: &[UploadedFile]) -> Result<PipelineRunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, files = files.len(), "🚀 Starting telemetry pipeline");

        let results = self.transform.transform_files(files).await;

        let clean = self.clean.clone();
        let input_dir = self.transform.output_dir().to_path_buf();
        let cleaned_dir = self.cleaned_dir.clone();
        let cleaning = tokio::task::spawn_blocking(move || clean.clean_folder(&input_dir, &cleaned_dir))
            .await
            .context("cleaning task panicked")?
            .context("cleaning phase failed")?;

        let store = self.store.clone();
        let cleaned_dir = self.cleaned_dir.clone();
        let storage = tokio::task::spawn_blocking(move || store.insert_folder(&cleaned_dir))
            .await
            .context("storage task panicked")?
            .context("storage phase failed")?;

        let finished_at = Utc::now();
        info!(
            %run_id,
            inserted = storage.total.inserted,
            anomalies = cleaning.anomalies,
            "🎉 Telemetry pipeline finished"
        );

        Ok(PipelineRunReport {
            run_id,
            started_at,
            finished_at,
            results,
            cleaning,
            storage,
        })
    }
}

/// Shared handle used by the HTTP layer.
pub type SharedPipeline = Arc<TelemetryPipeline>;
