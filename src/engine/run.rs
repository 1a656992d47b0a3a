//! Execution requests detached from the engine.
//!
//! [`ReportEngine::begin_run`](super::ReportEngine::begin_run) issues a
//! ticket and hands back a [`PendingRun`] that owns a handle to the backend.
//! Sending it does not borrow the engine, so the caller can keep editing or
//! start a newer run while it is in flight, then hand the [`RunResponse`]
//! back to [`ReportEngine::finish_run`](super::ReportEngine::finish_run).

use std::sync::Arc;

use crate::client::ClientResult;
use crate::execution::{ExecutionPage, ExecutionTicket, ReportExecutor, PAGE_SIZE};

/// An issued execution request that has not been sent yet.
#[derive(Debug)]
pub struct PendingRun<B: ?Sized> {
    ticket: ExecutionTicket,
    backend: Arc<B>,
}

impl<B: ReportExecutor + ?Sized> PendingRun<B> {
    pub(super) fn new(ticket: ExecutionTicket, backend: Arc<B>) -> Self {
        Self { ticket, backend }
    }

    pub fn ticket(&self) -> &ExecutionTicket {
        &self.ticket
    }

    /// Send the request and wait for the executor's answer.
    pub async fn send(self) -> RunResponse {
        let outcome = self
            .backend
            .execute_report(self.ticket.config(), self.ticket.page(), PAGE_SIZE)
            .await;
        RunResponse {
            ticket: self.ticket,
            outcome,
        }
    }
}

/// The executor's answer to a [`PendingRun`].
#[derive(Debug)]
pub struct RunResponse {
    ticket: ExecutionTicket,
    outcome: ClientResult<ExecutionPage>,
}

impl RunResponse {
    pub fn ticket(&self) -> &ExecutionTicket {
        &self.ticket
    }

    pub(super) fn into_parts(self) -> (ExecutionTicket, ClientResult<ExecutionPage>) {
        (self.ticket, self.outcome)
    }
}
