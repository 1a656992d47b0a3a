//! Persisted report definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::ReportConfig;

/// A report definition stored by a [`crate::persistence::ReportRepository`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedReport {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub config: ReportConfig,
}

impl SavedReport {
    pub fn summary(&self) -> SavedReportSummary {
        SavedReportSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Listing entry for a saved report (no config payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedReportSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
