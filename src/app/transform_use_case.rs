use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

use crate::app::clean_use_case::FileStatus;
use crate::app::ports::SchemaTransformer;
use crate::error::{Result, TelemetryError};
use crate::infra::canonical_shape::CanonicalShapeGuard;

/// A vendor document handed in for transformation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let filename = crate::pipeline::json_files::file_name(path);
        Ok(Self::new(filename, fs::read(path)?))
    }
}

/// Per-file transform result.
#[derive(Debug, Clone, Serialize)]
pub struct TransformResult {
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Load the canonical schema handed to the transformer.
pub fn load_canonical_schema(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| {
        TelemetryError::Config(format!(
            "Failed to read canonical schema '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Turns vendor documents into canonical-shaped files in `output_dir`.
pub struct TransformUseCase {
    transformer: Box<dyn SchemaTransformer>,
    guard: CanonicalShapeGuard,
    schema: Value,
    output_dir: PathBuf,
}

impl TransformUseCase {
    pub fn new(
        transformer: Box<dyn SchemaTransformer>,
        schema: Value,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            transformer,
            guard: CanonicalShapeGuard::new()?,
            schema,
            output_dir: output_dir.into(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Transform each file independently; a failure is recorded and the batch
    /// moves on.
    pub async fn transform_files(&self, files: &[UploadedFile]) -> Vec<TransformResult> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let started = Instant::now();
            match self.transform_one(file).await {
                Ok(output_path) => {
                    info!("Processed file: {}", file.filename);
                    crate::metrics::transform::file_transformed(started.elapsed().as_secs_f64());
                    results.push(TransformResult {
                        file: file.filename.clone(),
                        status: FileStatus::Success,
                        output_file: Some(output_path.display().to_string()),
                        error: None,
                    });
                }
                Err(e) => {
                    error!("Failed file: {} - {}", file.filename, e);
                    crate::metrics::transform::file_failed();
                    results.push(TransformResult {
                        file: file.filename.clone(),
                        status: FileStatus::Failed,
                        output_file: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        results
    }

    async fn transform_one(&self, file: &UploadedFile) -> Result<PathBuf> {
        // Only the final path component of an uploaded name is trusted
        let name = Path::new(&file.filename)
            .file_name()
            .ok_or_else(|| TelemetryError::Document(format!("invalid file name '{}'", file.filename)))?;

        let vendor: Value = serde_json::from_slice(&file.bytes)?;
        let canonical = self.transformer.transform(&self.schema, &vendor).await?;
        self.guard.check(&canonical)?;

        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_dir.join(name);
        fs::write(&output_path, serde_json::to_string_pretty(&canonical)?)?;
        Ok(output_path)
    }
}
