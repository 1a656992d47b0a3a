//! Query execution client.
//!
//! Turns a [`ReportConfig`] and a page number into a request against the
//! remote executor and owns the resulting [`ReportResult`].
//!
//! # Lifecycle
//!
//! ```text
//!            begin()                 complete(Ok)
//!   Idle ───────────────► Requesting ─────────────► Succeeded
//!    ▲                        │  ▲                      │
//!    │ clear()                │  │ retry()              │ begin()
//!    │                        ▼  │                      ▼
//!    └──────────────────── Failed ◄──────────────── Requesting
//!                     complete(Err)
//! ```
//!
//! Every [`ExecutionClient::begin`] issues a ticket with a strictly
//! increasing sequence number. [`ExecutionClient::complete`] only applies
//! the outcome of the most recent ticket; anything older is reported as
//! [`Completion::Stale`] and dropped, so a slow response can never
//! overwrite a newer one. In-flight requests are not cancelled. A request
//! whose response is never delivered leaves the client in `Requesting`,
//! from where [`ExecutionClient::retry`] reissues it.

mod executor;

pub use executor::{ExecutionPage, ReportExecutor};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::ClientError;
use crate::model::{NotReady, Pagination, ReportConfig, ReportResult};

/// Rows per page. Fixed; not user-configurable.
pub const PAGE_SIZE: u32 = 100;

/// Errors surfaced by [`ExecutionClient::execute`] and friends.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Local precondition failed; no request was sent.
    #[error(transparent)]
    NotReady(#[from] NotReady),

    /// The request failed or the executor answered `{success: false}`.
    #[error("report execution failed: {0}")]
    Failed(#[from] ClientError),

    /// A newer request was issued while this one was in flight.
    #[error("superseded by a newer request")]
    Superseded,

    /// `retry` was called with no failed or outstanding request.
    #[error("there is no execution to retry")]
    NothingToRetry,
}

impl ExecutionError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, ExecutionError::Failed(_))
    }
}

/// Where the client is in its request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Requesting { seq: u64, page: u32 },
    Succeeded { seq: u64 },
    Failed { seq: u64, message: String },
}

/// A request that has been issued but not completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTicket {
    seq: u64,
    config: ReportConfig,
    page: u32,
}

impl ExecutionTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Snapshot of the config at the time of the request.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

/// What happened when a ticket was completed.
#[derive(Debug)]
pub enum Completion {
    /// The result replaced the previous one.
    Applied,
    /// The request failed; the previous result was discarded.
    Failed(ClientError),
    /// The ticket is not the latest; nothing changed.
    Stale,
}

/// Owns pagination state and the last result.
#[derive(Debug)]
pub struct ExecutionClient {
    state: ExecutionState,
    latest_seq: u64,
    result: ReportResult,
    last_request: Option<(ReportConfig, u32)>,
}

impl Default for ExecutionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionClient {
    pub fn new() -> Self {
        Self {
            state: ExecutionState::Idle,
            latest_seq: 0,
            result: ReportResult::empty(),
            last_request: None,
        }
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn result(&self) -> &ReportResult {
        &self.result
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn pagination(&self) -> Pagination {
        self.result.pagination(PAGE_SIZE)
    }

    /// True after a failure, or while a request is outstanding. A request
    /// whose response never arrives can be reissued; the original becomes
    /// stale once the retry is issued.
    pub fn can_retry(&self) -> bool {
        matches!(
            self.state,
            ExecutionState::Failed { .. } | ExecutionState::Requesting { .. }
        ) && self.last_request.is_some()
    }

    /// Check preconditions and issue a ticket. Page 0 is treated as page 1.
    ///
    /// Returns [`NotReady`] without changing any state when the config has
    /// no connection or nothing selected.
    pub fn begin(&mut self, config: &ReportConfig, page: u32) -> Result<ExecutionTicket, NotReady> {
        config.ensure_executable()?;

        let page = page.max(1);
        self.latest_seq += 1;
        self.state = ExecutionState::Requesting {
            seq: self.latest_seq,
            page,
        };
        self.last_request = Some((config.clone(), page));
        debug!(seq = self.latest_seq, page, "execution requested");

        Ok(ExecutionTicket {
            seq: self.latest_seq,
            config: config.clone(),
            page,
        })
    }

    /// Apply the outcome of a ticket if it is still the latest.
    pub fn complete(
        &mut self,
        ticket: &ExecutionTicket,
        outcome: Result<ExecutionPage, ClientError>,
    ) -> Completion {
        if ticket.seq != self.latest_seq {
            debug!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "discarding stale execution response"
            );
            return Completion::Stale;
        }

        match outcome {
            Ok(page) => {
                info!(
                    seq = ticket.seq,
                    page = ticket.page,
                    rows = page.rows.len(),
                    total_rows = page.total_rows,
                    "execution succeeded"
                );
                self.result = ReportResult {
                    headers: page.headers,
                    rows: page.rows,
                    total_rows: page.total_rows,
                    current_page: ticket.page,
                };
                self.state = ExecutionState::Succeeded { seq: ticket.seq };
                Completion::Applied
            }
            Err(err) => {
                warn!(seq = ticket.seq, error = %err, "execution failed");
                self.result = ReportResult::empty();
                self.state = ExecutionState::Failed {
                    seq: ticket.seq,
                    message: err.to_string(),
                };
                Completion::Failed(err)
            }
        }
    }

    /// Reissue the last request that has not succeeded, under a new ticket.
    pub fn begin_retry(&mut self) -> Result<ExecutionTicket, ExecutionError> {
        if !self.can_retry() {
            return Err(ExecutionError::NothingToRetry);
        }
        let Some((config, page)) = self.last_request.clone() else {
            return Err(ExecutionError::NothingToRetry);
        };
        Ok(self.begin(&config, page)?)
    }

    /// Run one execution to completion.
    pub async fn execute<E>(
        &mut self,
        executor: &E,
        config: &ReportConfig,
        page: u32,
    ) -> Result<&ReportResult, ExecutionError>
    where
        E: ReportExecutor + ?Sized,
    {
        let ticket = self.begin(config, page)?;
        self.send(executor, ticket).await
    }

    /// Re-run the last failed request with the same config and page.
    pub async fn retry<E>(&mut self, executor: &E) -> Result<&ReportResult, ExecutionError>
    where
        E: ReportExecutor + ?Sized,
    {
        let ticket = self.begin_retry()?;
        self.send(executor, ticket).await
    }

    async fn send<E>(
        &mut self,
        executor: &E,
        ticket: ExecutionTicket,
    ) -> Result<&ReportResult, ExecutionError>
    where
        E: ReportExecutor + ?Sized,
    {
        let outcome = executor
            .execute_report(ticket.config(), ticket.page(), PAGE_SIZE)
            .await;

        match self.complete(&ticket, outcome) {
            Completion::Applied => Ok(&self.result),
            Completion::Failed(err) => Err(ExecutionError::Failed(err)),
            Completion::Stale => Err(ExecutionError::Superseded),
        }
    }

    /// Drop the current result and invalidate any request in flight.
    pub fn clear(&mut self) {
        self.latest_seq += 1;
        self.result = ReportResult::empty();
        self.state = ExecutionState::Idle;
        self.last_request = None;
    }
}
