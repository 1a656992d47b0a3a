//! Report persistence.
//!
//! Saved reports live behind the [`ReportRepository`] trait. Two
//! implementations ship with the crate:
//!
//! - [`crate::client::HttpClient`] talks to the backend's `saveReport`,
//!   `loadReports` and `loadReport` endpoints;
//! - [`LocalReportRepository`] keeps the same records in a SQLite file.
//!
//! The free functions in this module guard the repository calls (blank
//! names, missing ids) and turn a loaded config back into a full
//! [`PlacementSurface`].

mod local;

pub use local::LocalReportRepository;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::ClientError;
use crate::model::{ReportConfig, SavedReport, SavedReportSummary};
use crate::surface::PlacementSurface;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("a report name is required")]
    BlankName,

    #[error("the report has not been saved yet")]
    MissingId,

    #[error("report '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Client(ClientError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report store at {path} has version {found}, expected {expected}")]
    IncompatibleStore {
        path: PathBuf,
        found: i32,
        expected: i32,
    },

    #[error("stored report '{id}' is corrupt: {message}")]
    Corrupt { id: String, message: String },

    #[error("Failed to determine home directory")]
    NoHomeDir,
}

impl From<ClientError> for PersistenceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { id, .. } => PersistenceError::NotFound(id),
            other => PersistenceError::Client(other),
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Storage for saved report definitions.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Store a new report and return it with its assigned id.
    async fn save_report(&self, name: &str, config: &ReportConfig) -> PersistenceResult<SavedReport>;

    /// Replace the name and config of an existing report.
    async fn update_report(
        &self,
        id: &str,
        name: &str,
        config: &ReportConfig,
    ) -> PersistenceResult<SavedReport>;

    async fn list_reports(&self) -> PersistenceResult<Vec<SavedReportSummary>>;

    async fn load_report(&self, id: &str) -> PersistenceResult<SavedReport>;
}

/// A loaded report together with the surface rebuilt from its config.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedReport {
    pub report: SavedReport,
    pub surface: PlacementSurface,
}

pub async fn save<R>(repo: &R, name: &str, config: &ReportConfig) -> PersistenceResult<SavedReport>
where
    R: ReportRepository + ?Sized,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(PersistenceError::BlankName);
    }
    let saved = repo.save_report(name, config).await?;
    info!(id = %saved.id, name = %saved.name, "report saved");
    Ok(saved)
}

pub async fn update<R>(
    repo: &R,
    id: &str,
    name: &str,
    config: &ReportConfig,
) -> PersistenceResult<SavedReport>
where
    R: ReportRepository + ?Sized,
{
    if id.trim().is_empty() {
        return Err(PersistenceError::MissingId);
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(PersistenceError::BlankName);
    }
    let saved = repo.update_report(id, name, config).await?;
    info!(id = %saved.id, name = %saved.name, "report updated");
    Ok(saved)
}

pub async fn list<R>(repo: &R) -> PersistenceResult<Vec<SavedReportSummary>>
where
    R: ReportRepository + ?Sized,
{
    let reports = repo.list_reports().await?;
    debug!(count = reports.len(), "listed saved reports");
    Ok(reports)
}

/// Load a report and rehydrate its placement surface.
pub async fn load<R>(repo: &R, id: &str) -> PersistenceResult<LoadedReport>
where
    R: ReportRepository + ?Sized,
{
    if id.trim().is_empty() {
        return Err(PersistenceError::MissingId);
    }
    let report = repo.load_report(id).await?;
    let surface = PlacementSurface::from_config(&report.config);
    info!(id = %report.id, widgets = surface.len(), "report loaded");
    Ok(LoadedReport { report, surface })
}
