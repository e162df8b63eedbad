use crate::app::ports::AnomalySink;
use crate::error::{Result, TelemetryError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

fn format_lines(record_identity: &str, messages: &[String]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(record_identity);
        out.push_str(" - ");
        out.push_str(message);
        out.push('\n');
    }
    out
}

/// Plain-text anomaly log, one `"<identity> - <message>"` line per note.
///
/// The file is opened in append mode on every call and all lines of a call go
/// out in one write while the adapter's lock is held, so processors sharing an
/// adapter never interleave partial lines.
pub struct FileAnomalyLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAnomalyLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create the parent directory and make sure the log can be opened for
    /// append, so an unwritable location fails at startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let log = Self::new(path);
        log.append("")?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, text: &str) -> Result<()> {
        let fail = |source| TelemetryError::AnomalyLog {
            path: self.path.clone(),
            source,
        };

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(fail)?;
        file.write_all(text.as_bytes()).map_err(fail)?;
        Ok(())
    }
}

impl AnomalySink for FileAnomalyLog {
    fn log(&self, record_identity: &str, messages: &[String]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        for message in messages {
            warn!(record = %record_identity, "anomaly: {}", message);
        }
        self.append(&format_lines(record_identity, messages))
    }
}

/// Collects anomaly lines in memory.
#[derive(Default)]
pub struct InMemoryAnomalyLog {
    lines: Mutex<Vec<String>>,
}

impl InMemoryAnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AnomalySink for InMemoryAnomalyLog {
    fn log(&self, record_identity: &str, messages: &[String]) -> Result<()> {
        let mut lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.extend(
            messages
                .iter()
                .map(|message| format!("{} - {}", record_identity, message)),
        );
        Ok(())
    }
}
