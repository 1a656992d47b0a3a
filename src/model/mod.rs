//! Report definition types.
//!
//! [`ReportConfig`] is the single source of truth for a report. Field
//! references inside it are typed ([`FieldRef`]) but serialize as the plain
//! `table.column` / `calculated.<name>` strings the backend expects.

pub mod config;
pub mod field;
mod fingerprint;
pub mod result;
pub mod saved;

pub use config::{
    Aggregation, CalculatedField, ColumnSpec, FilterOperator, FilterSpec, GroupMethod, GroupSpec,
    JoinSpec, JoinType, NotReady, ReportConfig, ReportType, SortDirection, SortSpec,
    UnknownOption,
};
pub use field::{FieldRef, FieldRefError, CALCULATED_PREFIX};
pub use fingerprint::fingerprint;
pub use result::{Pagination, ReportResult, Row, Scalar};
pub use saved::{SavedReport, SavedReportSummary};
