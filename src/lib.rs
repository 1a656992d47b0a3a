//! # Quarry
//!
//! Client-side engine for an ad-hoc report builder: compose columns,
//! filters, groupings, sorts, joins and calculated fields against a
//! schema-discoverable backend, then execute, page, drill into, export and
//! save the result.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Schema Catalog (connections, tables, columns)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │ field references
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │     Placement Surface (columns, filters, groups, sorts)  │
//! │     + Calculated Field Compiler                          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sync: reconcile]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 ReportConfig (canonical)                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!          ┌───────────────┼────────────────┐
//!          ▼               ▼                ▼
//!     [execution]     [persistence]     [export]
//!    pages, drill    save/update/load   backend-rendered
//!       -down        + rehydration         files
//! ```
//!
//! [`engine::ReportEngine`] owns all of the above as one explicit state
//! container; [`client::HttpClient`] is the production backend.

pub mod calculated;
pub mod catalog;
pub mod client;
pub mod config;
pub mod drill;
pub mod engine;
pub mod execution;
pub mod export;
pub mod model;
pub mod persistence;
pub mod surface;
pub mod sync;
pub mod timer;
pub mod validation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::client::{ClientError, HttpClient, ReportBackend};
    pub use crate::engine::{Applied, Command, EngineError, Notice, NoticeLevel, ReportEngine};
    pub use crate::execution::PAGE_SIZE;
    pub use crate::export::ExportFormat;
    pub use crate::model::{
        Aggregation, FieldRef, FilterOperator, GroupMethod, ReportConfig, ReportResult, Scalar,
        SortDirection,
    };
    pub use crate::surface::{Target, WidgetId};
}

pub use engine::ReportEngine;
pub use model::{FieldRef, ReportConfig, ReportResult};
