use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

use crate::app::ports::{InsertOutcome, ReadingStore};
use crate::error::{Result, TelemetryError};
use crate::pipeline::processing::record::{identity_text, Record};

/// Flattened summary columns kept next to the raw document for quick lookups.
const REAL_COLUMNS: [(&str, &[&str]); 6] = [
    ("power_ac_active", &["power", "acActive"]),
    ("power_ac_reactive", &["power", "acReactive"]),
    ("electrical_ac_voltage", &["electrical", "acVoltage"]),
    ("electrical_ac_current", &["electrical", "acCurrent"]),
    ("temperature", &["thermal", "inverterTemp1"]),
    ("frequency", &["electrical", "frequency"]),
];

/// SQLite-backed reading store with a unique index on `(reading_id, timestamp)`.
pub struct SqliteReadingStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteReadingStore {
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn, table)
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        let valid = !table.is_empty()
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !table.starts_with(|c: char| c.is_ascii_digit());
        if !valid {
            return Err(TelemetryError::Config(format!(
                "collection name '{}' must be alphanumeric or underscore",
                table
            )));
        }

        let real_columns: String = REAL_COLUMNS
            .iter()
            .map(|(column, _)| format!("{} REAL,\n", column))
            .collect();
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                reading_id   TEXT NOT NULL,
                timestamp    TEXT NOT NULL,
                inverter_id  TEXT,
                site_id      TEXT,
                plant_id     TEXT,
                {real_columns}
                raw_document TEXT NOT NULL,
                stored_at    TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {table}_reading_timestamp
                ON {table} (reading_id, timestamp);
            "#
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock();
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
            row.get(0)
        })?;
        Ok(n as usize)
    }

    /// The stored raw document for a reading, if any.
    pub fn get_document(&self, reading_id: &str, timestamp: &str) -> Result<Option<Value>> {
        let conn = self.lock();
        let raw: Option<String> = conn
            .query_row(
                &format!(
                    "SELECT raw_document FROM {} WHERE reading_id = ?1 AND timestamp = ?2",
                    self.table
                ),
                params![reading_id, timestamp],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|text| serde_json::from_str(&text).map_err(TelemetryError::from))
            .transpose()
    }
}

impl ReadingStore for SqliteReadingStore {
    fn insert(&self, record: &Record) -> Result<InsertOutcome> {
        let identity = record.identity();
        let (Some(reading_id), Some(timestamp)) = (identity.reading_id, identity.timestamp) else {
            return Ok(InsertOutcome::MissingIdentity);
        };

        let text = |path: &[&str]| record.get(path).and_then(identity_text);
        let real = |path: &[&str]| record.get(path).and_then(Value::as_f64);
        let raw_document = serde_json::to_string(record)?;

        let columns: Vec<&str> = REAL_COLUMNS.iter().map(|(column, _)| *column).collect();
        let sql = format!(
            "INSERT OR IGNORE INTO {} (reading_id, timestamp, inverter_id, site_id, plant_id, {}, raw_document, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            self.table,
            columns.join(", ")
        );
        let reals: Vec<Option<f64>> = REAL_COLUMNS.iter().map(|(_, path)| real(*path)).collect();

        let conn = self.lock();
        let changed = conn.execute(
            &sql,
            params![
                reading_id,
                timestamp,
                identity.inverter_id,
                text(&["asset", "siteId"]),
                text(&["asset", "plantId"]),
                reals[0],
                reals[1],
                reals[2],
                reals[3],
                reals[4],
                reals[5],
                raw_document,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            Ok(InsertOutcome::DuplicateSkipped)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }
}
