//! Report backend client.
//!
//! [`HttpClient`] implements every backend trait the engine depends on:
//!
//! | Trait | Endpoints |
//! |---|---|
//! | [`SchemaProvider`] | `connections`, `tables`, `tableColumns` |
//! | [`ReportExecutor`] | `executeReport` |
//! | [`ReportRepository`] | `saveReport`, `loadReports`, `loadReport` |
//! | [`ExportService`] | `export-report` |
//!
//! [`ReportBackend`] bundles the four so the engine can be generic over a
//! single type parameter.

mod error;
mod http;
pub mod protocol;

pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, DEFAULT_CSRF_HEADER};

use crate::catalog::SchemaProvider;
use crate::execution::ReportExecutor;
use crate::export::ExportService;
use crate::persistence::ReportRepository;

/// Everything the engine needs from a backend.
pub trait ReportBackend: SchemaProvider + ReportExecutor + ReportRepository + ExportService {}

impl<T> ReportBackend for T where T: SchemaProvider + ReportExecutor + ReportRepository + ExportService {}
