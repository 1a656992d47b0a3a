//! The canonical report definition and its control enums.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::field::FieldRef;
use super::result::Scalar;

/// The canonical report definition.
///
/// The placement surface is the editable view; this value is always fully
/// rederived from it (see [`crate::sync`]) and is what gets executed, saved,
/// and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub connection_id: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub filters: Vec<FilterSpec>,
    pub groups: Vec<GroupSpec>,
    pub sorts: Vec<SortSpec>,
    pub joins: Vec<JoinSpec>,
    pub calculated_fields: Vec<CalculatedField>,
    /// Display names keyed by field reference. Not used for execution.
    pub column_aliases: BTreeMap<String, String>,
    /// Display formats keyed by field reference. Not used for execution.
    pub column_formats: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_filters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_prep_recipe: Option<serde_json::Value>,
}

/// Why a config cannot be executed yet.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NotReady {
    #[error("select a connection before running the report")]
    NoConnection,

    #[error("add at least one column or grouping before running the report")]
    NothingSelected,
}

impl ReportConfig {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: Some(connection_id.into()),
            ..Self::default()
        }
    }

    /// Execution requires a connection and at least one column or group.
    pub fn ensure_executable(&self) -> Result<(), NotReady> {
        match self.connection_id.as_deref() {
            None => return Err(NotReady::NoConnection),
            Some(id) if id.trim().is_empty() => return Err(NotReady::NoConnection),
            Some(_) => {}
        }
        if self.columns.is_empty() && self.groups.is_empty() {
            return Err(NotReady::NothingSelected);
        }
        Ok(())
    }

    pub fn is_executable(&self) -> bool {
        self.ensure_executable().is_ok()
    }

    pub fn calculated_field(&self, name: &str) -> Option<&CalculatedField> {
        self.calculated_fields.iter().find(|f| f.name == name)
    }

    pub fn drill_down_filters(&self) -> impl Iterator<Item = &FilterSpec> {
        self.filters.iter().filter(|f| f.is_drill_down)
    }

    /// Every field referenced by columns, filters, groups and sorts, in
    /// surface order.
    pub fn referenced_fields(&self) -> Vec<&FieldRef> {
        self.columns
            .iter()
            .map(|c| &c.field)
            .chain(self.filters.iter().map(|f| &f.field))
            .chain(self.groups.iter().map(|g| &g.field))
            .chain(self.sorts.iter().map(|s| &s.field))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: FieldRef,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub field: FieldRef,
    pub operator: FilterOperator,
    pub value: Scalar,
    #[serde(default)]
    pub is_drill_down: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub field: FieldRef,
    pub method: GroupMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: FieldRef,
    pub direction: SortDirection,
}

/// A join between two tables, addressed by field references on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSpec {
    pub left: FieldRef,
    pub right: FieldRef,
    #[serde(rename = "type", default)]
    pub join_type: JoinType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

/// A named derived field. The formula is opaque text; only the remote
/// executor evaluates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedField {
    pub name: String,
    pub formula: String,
    #[serde(default)]
    pub description: String,
}

impl CalculatedField {
    pub fn field_ref(&self) -> FieldRef {
        FieldRef::calculated(self.name.clone())
    }
}

/// Error for control values that do not name a known option.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownOption {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    #[default]
    None,
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

wire_enum!(Aggregation, "aggregation", {
    None => "NONE",
    Sum => "SUM",
    Avg => "AVG",
    Min => "MIN",
    Max => "MAX",
    Count => "COUNT",
});

impl Aggregation {
    /// SUM, AVG, MIN and MAX only make sense over numeric fields.
    pub fn requires_numeric(&self) -> bool {
        matches!(self, Self::Sum | Self::Avg | Self::Min | Self::Max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
}

wire_enum!(FilterOperator, "operator", {
    Eq => "=",
    NotEq => "!=",
    Gt => ">",
    Lt => "<",
    GtEq => ">=",
    LtEq => "<=",
    Like => "LIKE",
    In => "IN",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupMethod {
    #[default]
    Exact,
    Date,
    Month,
    Quarter,
    Year,
    Range,
}

wire_enum!(GroupMethod, "grouping method", {
    Exact => "exact",
    Date => "date",
    Month => "month",
    Quarter => "quarter",
    Year => "year",
    Range => "range",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

wire_enum!(SortDirection, "sort direction", {
    Asc => "ASC",
    Desc => "DESC",
});
