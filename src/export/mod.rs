//! Export dispatcher.
//!
//! Asks the backend to render the current report into a file. The backend
//! produces the bytes; this module only guards the request, names the file
//! and writes it to disk on demand.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{ClientError, ClientResult};
use crate::model::{ReportConfig, ReportResult, UnknownOption};

/// File formats the backend can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Excel, ExportFormat::Csv, ExportFormat::Pdf];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "excel",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == lower || f.extension() == lower)
            .ok_or_else(|| UnknownOption {
                kind: "export format",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    /// There is no result to export; nothing was sent.
    #[error("no data to export; run the report first")]
    NoData,

    #[error("export request failed: {0}")]
    Request(#[from] ClientError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Trait for the backend that renders export files.
#[async_trait]
pub trait ExportService: Send + Sync {
    async fn export_report(
        &self,
        config: &ReportConfig,
        format: ExportFormat,
        data: &ReportResult,
    ) -> ClientResult<Vec<u8>>;
}

/// A rendered export held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Write the file into `dir`, creating the directory if needed.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.filename);
        std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        std::fs::write(&path, &self.bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), bytes = self.bytes.len(), "export saved");
        Ok(path)
    }
}

/// `report-<unix millis>.<ext>`
pub fn export_filename(format: ExportFormat, unix_millis: i64) -> String {
    format!("report-{}.{}", unix_millis, format.extension())
}

/// Request an export of the last result.
///
/// Fails with [`ExportError::NoData`] before any request when the result
/// has no headers. Engine state is never changed here.
pub async fn export_report<S>(
    service: &S,
    config: &ReportConfig,
    last_result: &ReportResult,
    format: ExportFormat,
) -> Result<ExportedFile, ExportError>
where
    S: ExportService + ?Sized,
{
    if last_result.headers.is_empty() {
        return Err(ExportError::NoData);
    }

    let bytes = service
        .export_report(config, format, last_result)
        .await
        .map_err(|err| {
            warn!(%format, error = %err, "export failed");
            ExportError::Request(err)
        })?;

    let filename = export_filename(format, Utc::now().timestamp_millis());
    info!(%format, %filename, bytes = bytes.len(), "export received");
    Ok(ExportedFile {
        filename,
        format,
        bytes,
    })
}
