//! Report engine: the explicit state container.
//!
//! One [`ReportEngine`] owns everything a report builder session holds:
//!
//! ```text
//!                      ┌──────────────── ReportEngine<B> ────────────────┐
//!   Command ──apply──► │ surface ──reconcile──► config                   │
//!                      │ drill path     catalog     execution (result)   │
//!                      │ saved marker   search debouncer   notices       │
//!                      └───────────────────────┬─────────────────────────┘
//!                                              │ async operations
//!                                              ▼
//!                   B: ReportBackend (schema, execute, persist, export)
//! ```
//!
//! Edits go through [`Command`]s and are always followed by reconciliation,
//! so the config is a pure function of the surface plus the fields the
//! surface does not own. Network work happens in the async methods. Every
//! failure is returned as an [`EngineError`] and also recorded as a
//! [`Notice`] for display.
//!
//! Executions can also be driven in steps: [`ReportEngine::begin_run`]
//! returns a [`PendingRun`] that is sent without borrowing the engine, and
//! [`ReportEngine::finish_run`] applies its response. Responses to runs that
//! were overtaken by a newer one are discarded.

mod command;
mod notice;
mod run;

pub use command::{Applied, Command};
pub use notice::{Notice, NoticeLevel};
pub use run::{PendingRun, RunResponse};

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::calculated::CalculatedFieldError;
use crate::catalog::{BatchOutcome, CatalogError, ColumnInfo, Connection, SchemaCatalog, SearchResults};
use crate::client::ReportBackend;
use crate::config::Settings;
use crate::drill::{self, DrillError, DrillPath, DrillStep};
use crate::execution::{Completion, ExecutionClient, ExecutionError, ExecutionState};
use crate::export::{self, ExportError, ExportFormat, ExportedFile};
use crate::model::{
    fingerprint, Aggregation, FieldRef, Pagination, ReportConfig, ReportResult, SavedReport,
    SavedReportSummary, Scalar,
};
use crate::persistence::{self, PersistenceError};
use crate::surface::{PlacementSurface, SurfaceError, WidgetId};
use crate::sync;
use crate::timer::Debouncer;
use crate::validation::{self, ConfigIssue};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown field '{0}'")]
    UnknownField(FieldRef),

    #[error("no widget {0} on the surface")]
    UnknownWidget(WidgetId),

    #[error("{aggregation} cannot be applied to '{field}' of type {data_type}")]
    NonNumericAggregation {
        field: FieldRef,
        aggregation: Aggregation,
        data_type: String,
    },

    #[error("no calculated field named '{0}'")]
    UnknownCalculatedField(String),

    #[error("no join at position {0}")]
    UnknownJoin(usize),

    #[error("there is no drill-down to climb out of")]
    NotDrilled,

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Calculated(#[from] CalculatedFieldError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Drill(#[from] DrillError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl EngineError {
    /// The notice shown for this error.
    pub fn notice(&self) -> Notice {
        match self {
            EngineError::Execution(ExecutionError::NotReady(_)) => Notice::warning(self.to_string()),
            EngineError::Execution(ExecutionError::Superseded) => Notice::info(self.to_string()),
            EngineError::Execution(err) if err.is_retriable() => {
                Notice::error(self.to_string()).with_retry()
            }
            _ => Notice::error(self.to_string()),
        }
    }
}

/// Identity of the saved report the session is editing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SavedMarker {
    id: String,
    name: String,
    fingerprint: Option<String>,
}

/// State container for one report builder session.
pub struct ReportEngine<B> {
    backend: Arc<B>,
    config: ReportConfig,
    surface: PlacementSurface,
    drill: DrillPath,
    catalog: SchemaCatalog,
    execution: ExecutionClient,
    saved: Option<SavedMarker>,
    search: Debouncer<String>,
    search_results: SearchResults,
    notices: Vec<Notice>,
}

impl<B: ReportBackend> ReportEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, &Settings::default())
    }

    pub fn with_settings(backend: B, settings: &Settings) -> Self {
        Self {
            backend: Arc::new(backend),
            config: ReportConfig::default(),
            surface: PlacementSurface::new(),
            drill: DrillPath::new(),
            catalog: SchemaCatalog::new(),
            execution: ExecutionClient::new(),
            saved: None,
            search: Debouncer::new(settings.catalog.search_debounce()),
            search_results: SearchResults::default(),
            notices: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn surface(&self) -> &PlacementSurface {
        &self.surface
    }

    pub fn drill_path(&self) -> &DrillPath {
        &self.drill
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn result(&self) -> &ReportResult {
        self.execution.result()
    }

    pub fn pagination(&self) -> Pagination {
        self.execution.pagination()
    }

    pub fn execution_state(&self) -> &ExecutionState {
        self.execution.state()
    }

    pub fn saved_id(&self) -> Option<&str> {
        self.saved.as_ref().map(|s| s.id.as_str())
    }

    pub fn saved_name(&self) -> Option<&str> {
        self.saved.as_ref().map(|s| s.name.as_str())
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Issues in the current config, checked against the loaded schema.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        validation::validate(&self.config, &self.catalog)
    }

    /// True when the config differs from what was last saved or loaded,
    /// or has never been saved.
    pub fn has_unsaved_changes(&self) -> bool {
        let Some(saved) = &self.saved else {
            return true;
        };
        match (&saved.fingerprint, fingerprint(&self.config)) {
            (Some(saved), Ok(current)) => *saved != current,
            _ => true,
        }
    }

    /// Start editing `config` from scratch: the surface and drill path are
    /// rebuilt from it and the result is cleared.
    pub fn open(&mut self, config: ReportConfig) {
        self.surface = PlacementSurface::from_config(&config);
        self.drill = DrillPath::recover(&self.surface);
        self.config = config;
        sync::reconcile(&self.surface, &mut self.config);
        self.switch_connection();
        self.execution.clear();
        self.saved = None;
    }

    /// Point the catalog at the config's connection. When it changes,
    /// everything derived from the old connection is dropped.
    fn switch_connection(&mut self) -> bool {
        let changed = self
            .catalog
            .select_connection(self.config.connection_id.as_deref());
        if changed {
            self.execution.clear();
            self.search_results = SearchResults::default();
            self.search.cancel();
        }
        changed
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        let notice = err.notice();
        warn!(level = %notice.level, message = %notice.message, "operation failed");
        self.notices.push(notice);
        err
    }

    // ------------------------------------------------------------------
    // Schema catalog
    // ------------------------------------------------------------------

    pub async fn refresh_connections(&mut self) -> EngineResult<&[Connection]> {
        let outcome = self.catalog.refresh_connections(self.backend.as_ref()).await;
        if let Err(err) = outcome.map(|_| ()) {
            return Err(self.fail(err.into()));
        }
        Ok(self.catalog.connections())
    }

    pub async fn load_tables(&mut self) -> EngineResult<&[String]> {
        let outcome = self.catalog.tables(self.backend.as_ref()).await;
        if let Err(err) = outcome.map(|_| ()) {
            return Err(self.fail(err.into()));
        }
        Ok(self.catalog.cached_tables().unwrap_or_default())
    }

    pub async fn load_columns(&mut self, table: &str) -> EngineResult<&[ColumnInfo]> {
        let outcome = self.catalog.columns(self.backend.as_ref(), table).await;
        if let Err(err) = outcome.map(|_| ()) {
            return Err(self.fail(err.into()));
        }
        Ok(self.catalog.cached_columns(table).unwrap_or_default())
    }

    /// Fetch several tables' columns concurrently. Per-table failures are
    /// recorded as notices; the call itself only fails without a connection.
    pub async fn load_columns_batch(&mut self, tables: &[String]) -> EngineResult<BatchOutcome> {
        let backend = self.backend.as_ref();
        let outcome = match self.catalog.load_columns_batch(backend, tables).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail(err.into())),
        };
        for table in &outcome.failed {
            let region = crate::catalog::CatalogRegion::Table(table.clone());
            let message = self.catalog.error(&region).unwrap_or("unknown error").to_string();
            self.notices
                .push(Notice::error(format!("failed to load {}: {}", region, message)));
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Catalog search
    // ------------------------------------------------------------------

    /// Record a keystroke in the search box. Only the last query of a burst
    /// is evaluated, once the debounce delay has passed.
    pub fn search(&mut self, query: impl Into<String>) {
        self.search.schedule(query.into());
    }

    pub fn search_results(&self) -> &SearchResults {
        &self.search_results
    }

    /// Evaluate the pending query if its delay has elapsed.
    pub fn poll_search(&mut self) -> Option<&SearchResults> {
        let query = self.search.poll()?;
        self.search_results = self.catalog.search(&query);
        Some(&self.search_results)
    }

    /// Wait for the pending query's delay, then evaluate it.
    pub async fn settle_search(&mut self) -> Option<&SearchResults> {
        let query = self.search.fired().await?;
        self.search_results = self.catalog.search(&query);
        Some(&self.search_results)
    }

    // ------------------------------------------------------------------
    // Execution and pagination
    // ------------------------------------------------------------------

    /// Issue a request for `page` of the current config. Nothing is sent
    /// until the returned run is sent.
    pub fn begin_run(&mut self, page: u32) -> EngineResult<PendingRun<B>> {
        match self.execution.begin(&self.config, page) {
            Ok(ticket) => Ok(PendingRun::new(ticket, Arc::clone(&self.backend))),
            Err(reason) => Err(self.fail(ExecutionError::NotReady(reason).into())),
        }
    }

    /// Reissue the last request that failed or never got a response.
    pub fn begin_retry(&mut self) -> EngineResult<PendingRun<B>> {
        match self.execution.begin_retry() {
            Ok(ticket) => Ok(PendingRun::new(ticket, Arc::clone(&self.backend))),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Apply the response of a run. A response overtaken by a newer run is
    /// discarded and reported as [`ExecutionError::Superseded`].
    pub fn finish_run(&mut self, response: RunResponse) -> EngineResult<&ReportResult> {
        let (ticket, outcome) = response.into_parts();
        match self.execution.complete(&ticket, outcome) {
            Completion::Applied => {
                info!(
                    page = self.execution.result().current_page,
                    total_rows = self.execution.result().total_rows,
                    "report executed"
                );
                Ok(self.execution.result())
            }
            Completion::Failed(err) => Err(self.fail(ExecutionError::Failed(err).into())),
            Completion::Stale => Err(self.fail(ExecutionError::Superseded.into())),
        }
    }

    /// Execute the current config and fetch `page`.
    pub async fn run(&mut self, page: u32) -> EngineResult<&ReportResult> {
        let response = self.begin_run(page)?.send().await;
        self.finish_run(response)
    }

    /// Re-run the last execution that failed or was abandoned, with the
    /// same arguments.
    pub async fn retry(&mut self) -> EngineResult<&ReportResult> {
        let response = self.begin_retry()?.send().await;
        self.finish_run(response)
    }

    /// Fetch `page`, clamped to the pages of the current result.
    pub async fn go_to_page(&mut self, page: u32) -> EngineResult<&ReportResult> {
        let total = self.pagination().total_pages();
        let page = if total == 0 { 1 } else { page.clamp(1, total) };
        self.run(page).await
    }

    /// Fetch the next page; stays put on the last page.
    pub async fn next_page(&mut self) -> EngineResult<&ReportResult> {
        let pagination = self.pagination();
        if !pagination.has_next() {
            return Ok(self.execution.result());
        }
        self.run(pagination.current_page + 1).await
    }

    /// Fetch the previous page; stays put on the first page.
    pub async fn previous_page(&mut self) -> EngineResult<&ReportResult> {
        let pagination = self.pagination();
        if !pagination.has_previous() {
            return Ok(self.execution.result());
        }
        self.run(pagination.current_page - 1).await
    }

    // ------------------------------------------------------------------
    // Drill-down
    // ------------------------------------------------------------------

    /// Narrow the result to `field = value` and re-run from page 1.
    pub async fn drill_into(
        &mut self,
        field: FieldRef,
        value: impl Into<Scalar>,
    ) -> EngineResult<&ReportResult> {
        if let Err(err) = drill::drill_into(&mut self.surface, &mut self.drill, field, value) {
            return Err(self.fail(err.into()));
        }
        sync::reconcile(&self.surface, &mut self.config);
        self.run(1).await
    }

    /// Undo the latest drill-down and re-run from page 1.
    pub async fn climb_up(&mut self) -> EngineResult<DrillStep> {
        let Some(step) = drill::climb_up(&mut self.surface, &mut self.drill) else {
            return Err(self.fail(EngineError::NotDrilled));
        };
        sync::reconcile(&self.surface, &mut self.config);
        self.run(1).await?;
        Ok(step)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Render the last result through the backend. Engine state is left
    /// untouched whether this succeeds or not.
    pub async fn export(&mut self, format: ExportFormat) -> EngineResult<ExportedFile> {
        let backend = self.backend.as_ref();
        let outcome =
            export::export_report(backend, &self.config, self.execution.result(), format).await;
        match outcome {
            Ok(file) => Ok(file),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save the current config as a new report.
    pub async fn save(&mut self, name: &str) -> EngineResult<SavedReport> {
        match persistence::save(self.backend.as_ref(), name, &self.config).await {
            Ok(saved) => {
                self.mark_saved(&saved);
                Ok(saved)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Overwrite the report last saved or loaded.
    pub async fn update(&mut self) -> EngineResult<SavedReport> {
        let (id, name) = match &self.saved {
            Some(saved) => (saved.id.clone(), saved.name.clone()),
            None => (String::new(), String::new()),
        };
        match persistence::update(self.backend.as_ref(), &id, &name, &self.config).await {
            Ok(saved) => {
                self.mark_saved(&saved);
                Ok(saved)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    pub async fn list_saved(&mut self) -> EngineResult<Vec<SavedReportSummary>> {
        let outcome = persistence::list(self.backend.as_ref()).await;
        match outcome {
            Ok(reports) => Ok(reports),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Load a saved report and rebuild the whole builder from it.
    pub async fn load(&mut self, id: &str) -> EngineResult<&ReportConfig> {
        let loaded = match persistence::load(self.backend.as_ref(), id).await {
            Ok(loaded) => loaded,
            Err(err) => return Err(self.fail(err.into())),
        };

        self.surface = loaded.surface;
        self.drill = DrillPath::recover(&self.surface);
        self.config = loaded.report.config.clone();
        sync::reconcile(&self.surface, &mut self.config);
        self.switch_connection();
        self.execution.clear();
        self.mark_saved(&loaded.report);
        Ok(&self.config)
    }

    fn mark_saved(&mut self, report: &SavedReport) {
        self.saved = Some(SavedMarker {
            id: report.id.clone(),
            name: report.name.clone(),
            fingerprint: fingerprint(&self.config).ok(),
        });
    }
}
