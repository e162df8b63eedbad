use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::*;
use crate::error::{Result, TelemetryError};
use crate::pipeline::processing::quality_gate::{RangeTable, ValidationRule};

/// Runtime configuration: defaults, then an optional TOML file, then
/// environment variables (a `.env` file is honored).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_name: String,
    pub ollama_url: String,
    pub canonical_path: PathBuf,
    pub prompt_path: PathBuf,
    pub output_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub log_dir: PathBuf,
    pub anomaly_log_path: PathBuf,
    pub store_path: PathBuf,
    pub collection_name: String,
    pub server_addr: String,
    pub validation: ValidationConfig,
}

/// Optional replacement for the built-in range table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub rules: Vec<ValidationRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            canonical_path: PathBuf::from(DEFAULT_CANONICAL_PATH),
            prompt_path: PathBuf::from(DEFAULT_PROMPT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cleaned_dir: PathBuf::from(DEFAULT_CLEANED_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            anomaly_log_path: PathBuf::from(DEFAULT_ANOMALY_LOG),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            validation: ValidationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration. An explicit `path` must exist; without one,
    /// `config.toml` in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TelemetryError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set_string = |target: &mut String, key: &str| {
            if let Some(v) = lookup(key).filter(|v| !v.is_empty()) {
                *target = v;
            }
        };
        set_string(&mut self.model_name, ENV_MODEL_NAME);
        set_string(&mut self.ollama_url, ENV_OLLAMA_URL);
        set_string(&mut self.collection_name, ENV_COLLECTION_NAME);
        set_string(&mut self.server_addr, ENV_SERVER_ADDR);

        let set_path = |target: &mut PathBuf, key: &str| {
            if let Some(v) = lookup(key).filter(|v| !v.is_empty()) {
                *target = PathBuf::from(v);
            }
        };
        set_path(&mut self.canonical_path, ENV_CANONICAL_PATH);
        set_path(&mut self.prompt_path, ENV_PROMPT_PATH);
        set_path(&mut self.output_dir, ENV_OUTPUT_DIR);
        set_path(&mut self.cleaned_dir, ENV_CLEANED_DIR);
        set_path(&mut self.log_dir, ENV_LOG_DIR);
        set_path(&mut self.anomaly_log_path, ENV_ANOMALY_LOG);
        set_path(&mut self.store_path, ENV_STORE_PATH);
    }

    /// Configured rules, or the built-in inverter table when none are given.
    pub fn range_table(&self) -> Result<RangeTable> {
        if self.validation.rules.is_empty() {
            return Ok(RangeTable::default());
        }
        RangeTable::from_rules(self.validation.rules.iter().cloned())
    }

    /// Create the output, cleaned and log directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.cleaned_dir, &self.log_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
