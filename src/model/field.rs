//! Field references.
//!
//! A field reference names either a catalog column (`table.column`) or a
//! calculated field (`calculated.<name>`). On the wire it is always the plain
//! string form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix that marks a reference to a calculated field.
pub const CALCULATED_PREFIX: &str = "calculated";

/// Errors produced when parsing a field reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldRefError {
    #[error("field reference is empty")]
    Empty,

    #[error("field reference '{0}' is not of the form table.column or calculated.<name>")]
    Unqualified(String),
}

/// A reference to a queryable field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldRef {
    /// A column known to the schema catalog.
    Column { table: String, column: String },
    /// A user-defined calculated field, by name.
    Calculated(String),
}

impl FieldRef {
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn calculated(name: impl Into<String>) -> Self {
        Self::Calculated(name.into())
    }

    /// Parse `table.column` or `calculated.<name>`.
    ///
    /// Tables may themselves be schema-qualified (`sales.orders.amount`); the
    /// column is whatever follows the last dot.
    pub fn parse(s: &str) -> Result<Self, FieldRefError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(FieldRefError::Empty);
        }

        if let Some(name) = s
            .strip_prefix(CALCULATED_PREFIX)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            if name.is_empty() {
                return Err(FieldRefError::Unqualified(s.to_string()));
            }
            return Ok(Self::Calculated(name.to_string()));
        }

        match s.rsplit_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(Self::column(table, column))
            }
            _ => Err(FieldRefError::Unqualified(s.to_string())),
        }
    }

    pub fn is_calculated(&self) -> bool {
        matches!(self, Self::Calculated(_))
    }

    /// Table name for column references.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Column { table, .. } => Some(table),
            Self::Calculated(_) => None,
        }
    }

    /// The bracketed token used inside calculated-field formulas.
    pub fn formula_token(&self) -> String {
        format!("[{}]", self)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column { table, column } => write!(f, "{}.{}", table, column),
            Self::Calculated(name) => write!(f, "{}.{}", CALCULATED_PREFIX, name),
        }
    }
}

impl FromStr for FieldRef {
    type Err = FieldRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldRef {
    type Error = FieldRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldRef> for String {
    fn from(value: FieldRef) -> Self {
        value.to_string()
    }
}
