use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reading store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported document: {0}")]
    Document(String),

    /// The anomaly audit trail could not be written. Never per-record.
    #[error("Anomaly log '{}' is not writable: {source}", .path.display())]
    AnomalyLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform failed: {message}")]
    Transform { message: String },

    #[error("Canonical shape check failed: {0}")]
    Schema(String),
}

impl TelemetryError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TelemetryError::AnomalyLog { .. })
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
