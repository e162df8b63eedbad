//! Defaults and environment variable names shared by the config layer, the CLI
//! and the HTTP surface.

// Environment variable names (read after `.env` is loaded)
pub const ENV_MODEL_NAME: &str = "MODEL_NAME";
pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";
pub const ENV_CANONICAL_PATH: &str = "CANONICAL_PATH";
pub const ENV_PROMPT_PATH: &str = "PROMPT_PATH";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const ENV_CLEANED_DIR: &str = "CLEANED_FILES";
pub const ENV_LOG_DIR: &str = "LOG_DIR";
pub const ENV_ANOMALY_LOG: &str = "ANOMALY_LOG";
pub const ENV_STORE_PATH: &str = "STORE_PATH";
pub const ENV_COLLECTION_NAME: &str = "COLLECTION_NAME";
pub const ENV_SERVER_ADDR: &str = "SERVER_ADDR";

// Defaults
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_MODEL_NAME: &str = "qwen2.5vl:7b";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CANONICAL_PATH: &str = "config/solar_canonical.json";
pub const DEFAULT_PROMPT_PATH: &str = "config/prompt.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "data/outputs";
pub const DEFAULT_CLEANED_DIR: &str = "data/outputs/cleaned_outputs";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_ANOMALY_LOG: &str = "anomalies_log.txt";
pub const DEFAULT_STORE_PATH: &str = "data/readings.db";
pub const DEFAULT_COLLECTION_NAME: &str = "readings";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8000";

/// Prefix of every file written by the cleaning batch.
pub const CLEANED_FILE_PREFIX: &str = "cleaned_";

/// Only files with this extension are picked up from a batch folder.
pub const JSON_EXTENSION: &str = "json";

/// Identity used in the anomaly log when a record carries none.
pub const UNKNOWN_IDENTITY: &str = "UNKNOWN";

/// Legacy top-level keys that older transforms embedded in the record.
pub const ANOMALY_METADATA_KEYS: [&str; 2] = ["anomalies", "anomalyFlag"];
