//! Result sets returned by the report executor.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// True for `null` and for text that is blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// One result row, keyed by header.
pub type Row = BTreeMap<String, Scalar>;

/// The page of rows produced by the last successful execution.
///
/// Never persisted. Replaced wholesale on each successful execution and
/// cleared on failure, navigation away, or connection change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReportResult {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub total_rows: u64,
    pub current_page: u32,
}

impl ReportResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// No headers means there is nothing to show or export.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn cell(&self, row: usize, header: &str) -> Option<&Scalar> {
        self.rows.get(row).and_then(|r| r.get(header))
    }

    pub fn pagination(&self, page_size: u32) -> Pagination {
        Pagination {
            current_page: self.current_page,
            total_rows: self.total_rows,
            page_size,
        }
    }
}

/// Page arithmetic over a result's total row count. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_rows: u64,
    pub page_size: u32,
}

impl Pagination {
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 || self.total_rows == 0 {
            return 0;
        }
        let pages = self.total_rows.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Number of rows a given page should hold.
    pub fn rows_on_page(&self, page: u32) -> u64 {
        if page == 0 || page > self.total_pages() {
            return 0;
        }
        let start = u64::from(page - 1) * u64::from(self.page_size);
        (self.total_rows - start).min(u64::from(self.page_size))
    }
}
