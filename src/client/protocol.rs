//! Wire types for the report backend's REST endpoints.
//!
//! Request bodies borrow from engine state; response envelopes are decoded
//! and then converted into model types by [`super::HttpClient`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::ColumnInfo;
use crate::export::ExportFormat;
use crate::model::{ReportConfig, ReportResult, Row, SavedReport, SavedReportSummary};
use chrono::{DateTime, Utc};

// ============================================================================
// Endpoint names (used for logging and error context)
// ============================================================================

pub mod endpoints {
    pub const CONNECTIONS: &str = "connections";
    pub const TABLES: &str = "tables";
    pub const TABLE_COLUMNS: &str = "tableColumns";
    pub const EXECUTE_REPORT: &str = "executeReport";
    pub const SAVE_REPORT: &str = "saveReport";
    pub const LOAD_REPORTS: &str = "loadReports";
    pub const LOAD_REPORT: &str = "loadReport";
    pub const EXPORT_REPORT: &str = "export-report";
}

/// Accept identifiers sent either as JSON strings or numbers.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

// ============================================================================
// Schema catalog
// ============================================================================

/// Response of `tableColumns`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableColumnsResponse {
    pub columns: Vec<ColumnInfo>,
}

// ============================================================================
// Execution
// ============================================================================

/// Body of `executeReport`.
#[derive(Debug, Serialize)]
pub struct ExecuteReportRequest<'a> {
    pub report_config: ExecutePayload<'a>,
}

/// The report config with paging parameters merged in.
#[derive(Debug, Serialize)]
pub struct ExecutePayload<'a> {
    #[serde(flatten)]
    pub config: &'a ReportConfig,
    pub page: u32,
    pub page_size: u32,
}

/// Response envelope of `executeReport`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteReportResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ResultData>,
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResultData {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

// ============================================================================
// Persistence
// ============================================================================

/// Body of `saveReport`. Carrying `report_id` turns the save into an update.
#[derive(Debug, Serialize)]
pub struct SaveReportRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<&'a str>,
    pub report_name: &'a str,
    pub report_config: &'a ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveReportResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub report_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSummaryWire {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReportSummaryWire> for SavedReportSummary {
    fn from(w: ReportSummaryWire) -> Self {
        SavedReportSummary {
            id: w.id,
            name: w.name,
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadReportsResponse {
    pub success: bool,
    #[serde(default)]
    pub reports: Vec<ReportSummaryWire>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedReportWire {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(alias = "report_config")]
    pub config: ReportConfig,
}

impl From<SavedReportWire> for SavedReport {
    fn from(w: SavedReportWire) -> Self {
        SavedReport {
            id: w.id,
            name: w.name,
            created_at: w.created_at,
            config: w.config,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadReportResponse {
    pub success: bool,
    #[serde(default)]
    pub report: Option<SavedReportWire>,
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Export
// ============================================================================

/// Body of `export-report`.
#[derive(Debug, Serialize)]
pub struct ExportReportRequest<'a> {
    pub report_config: &'a ReportConfig,
    pub format: ExportFormat,
    pub data: &'a ReportResult,
}
