//! SQLite-backed report repository.
//!
//! Stored in `~/.quarry/reports.db` unless a path is configured. Configs
//! are kept as JSON text in the same camelCase shape the backend uses.
//!
//! The store is versioned. A version mismatch is reported as
//! [`PersistenceError::IncompatibleStore`]; the file is never wiped.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{PersistenceError, PersistenceResult, ReportRepository};
use crate::model::{ReportConfig, SavedReport, SavedReportSummary};

/// Current store schema version.
const STORE_VERSION: i32 = 1;

pub struct LocalReportRepository {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl LocalReportRepository {
    /// Open or create the store at the default location.
    pub fn open() -> PersistenceResult<Self> {
        Self::open_at(&Self::default_path()?)
    }

    /// Open or create the store at `path`, creating parent directories.
    pub fn open_at(path: &Path) -> PersistenceResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, path.to_path_buf())
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> PersistenceResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    pub fn default_path() -> PersistenceResult<PathBuf> {
        let base = dirs::home_dir().ok_or(PersistenceError::NoHomeDir)?;
        Ok(base.join(".quarry").join("reports.db"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init(conn: Connection, path: PathBuf) -> PersistenceResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                config TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                row.get(0)
            })
            .optional()?;

        match stored.map(|s| s.parse::<i32>().unwrap_or(0)) {
            Some(v) if v == STORE_VERSION => {}
            Some(found) => {
                return Err(PersistenceError::IncompatibleStore {
                    path,
                    found,
                    expected: STORE_VERSION,
                });
            }
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('version', ?)",
                    params![STORE_VERSION.to_string()],
                )?;
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fetch(&self, id: &str) -> PersistenceResult<SavedReport> {
        let row: Option<(String, String, String)> = self
            .conn()
            .query_row(
                "SELECT name, created_at, config FROM reports WHERE id = ?",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (name, created_at, config) =
            row.ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        let config: ReportConfig =
            serde_json::from_str(&config).map_err(|e| PersistenceError::Corrupt {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        Ok(SavedReport {
            id: id.to_string(),
            name,
            created_at: parse_timestamp(id, &created_at)?,
            config,
        })
    }
}

#[async_trait]
impl ReportRepository for LocalReportRepository {
    async fn save_report(&self, name: &str, config: &ReportConfig) -> PersistenceResult<SavedReport> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let json = serde_json::to_string(config)?;
        self.conn().execute(
            "INSERT INTO reports (id, name, created_at, updated_at, config) VALUES (?, ?, ?, ?, ?)",
            params![id, name, now.to_rfc3339(), now.to_rfc3339(), json],
        )?;

        Ok(SavedReport {
            id,
            name: name.to_string(),
            created_at: now,
            config: config.clone(),
        })
    }

    async fn update_report(
        &self,
        id: &str,
        name: &str,
        config: &ReportConfig,
    ) -> PersistenceResult<SavedReport> {
        let json = serde_json::to_string(config)?;
        let rows = self.conn().execute(
            "UPDATE reports SET name = ?, config = ?, updated_at = ? WHERE id = ?",
            params![name, json, Utc::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(PersistenceError::NotFound(id.to_string()));
        }
        self.fetch(id)
    }

    async fn list_reports(&self) -> PersistenceResult<Vec<SavedReportSummary>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM reports ORDER BY created_at DESC, id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut reports = Vec::new();
        for row in rows {
            let (id, name, created_at) = row?;
            let created_at = parse_timestamp(&id, &created_at)?;
            reports.push(SavedReportSummary {
                id,
                name,
                created_at,
            });
        }
        Ok(reports)
    }

    async fn load_report(&self, id: &str) -> PersistenceResult<SavedReport> {
        self.fetch(id)
    }
}

fn parse_timestamp(id: &str, value: &str) -> PersistenceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Corrupt {
            id: id.to_string(),
            message: format!("bad timestamp '{}': {}", value, e),
        })
}
