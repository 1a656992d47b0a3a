//! ReportExecutor trait definition.

use async_trait::async_trait;

use crate::client::ClientResult;
use crate::model::{ReportConfig, Row};

/// One page of rows as returned by the executor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionPage {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub total_rows: u64,
}

/// Trait for running a report config remotely.
///
/// Implementations must map a `{success: false}` envelope to
/// [`crate::client::ClientError::Remote`].
#[async_trait]
pub trait ReportExecutor: Send + Sync {
    /// Execute `config` and return rows of the 1-based `page`.
    async fn execute_report(
        &self,
        config: &ReportConfig,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ExecutionPage>;
}
