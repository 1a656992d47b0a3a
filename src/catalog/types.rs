//! Catalog metadata types.

use serde::{Deserialize, Serialize};

/// A data source connection the user can build reports against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(deserialize_with = "crate::client::protocol::id_string")]
    pub id: String,
    pub nickname: String,
}

/// Column name and database type as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
}

/// SQL type names treated as numeric, compared case-insensitively after
/// stripping any `(precision, scale)` suffix.
const NUMERIC_TYPES: &[&str] = &[
    "int",
    "integer",
    "tinyint",
    "smallint",
    "mediumint",
    "bigint",
    "int2",
    "int4",
    "int8",
    "decimal",
    "numeric",
    "number",
    "float",
    "float4",
    "float8",
    "double",
    "double precision",
    "real",
    "money",
    "smallmoney",
];

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        let lowered = self.data_type.to_ascii_lowercase();
        let base = lowered
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches(" unsigned");
        NUMERIC_TYPES.contains(&base)
    }
}
