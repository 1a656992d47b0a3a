//! Validation of report configs.
//!
//! Checks a [`ReportConfig`] against the loaded schema catalog and reports
//! every problem found. Nothing here blocks editing; the engine decides
//! which issues are fatal for which operation.

use std::collections::HashSet;

use crate::catalog::{Resolution, SchemaCatalog};
use crate::model::{Aggregation, FieldRef, NotReady, ReportConfig};

/// A problem found in a report config.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    /// The config cannot be executed as is.
    NotExecutable(NotReady),
    /// A field reference names a calculated field or column that does not exist.
    UnresolvedField { usage: &'static str, field: FieldRef },
    /// A numeric aggregation is applied to a non-numeric column.
    NonNumericAggregation {
        field: FieldRef,
        aggregation: Aggregation,
        data_type: String,
    },
    /// Two calculated fields share a name.
    DuplicateCalculatedField { name: String },
    /// The same field appears more than once in one list.
    RedundantPlacement { usage: &'static str, field: FieldRef },
}

impl ConfigIssue {
    /// Whether the issue will make the backend reject the report.
    pub fn is_error(&self) -> bool {
        !matches!(self, ConfigIssue::RedundantPlacement { .. })
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigIssue::NotExecutable(reason) => write!(f, "Not ready: {}", reason),
            ConfigIssue::UnresolvedField { usage, field } => {
                write!(f, "{} references unknown field '{}'", usage, field)
            }
            ConfigIssue::NonNumericAggregation {
                field,
                aggregation,
                data_type,
            } => {
                write!(
                    f,
                    "{} cannot be applied to '{}' of type {}",
                    aggregation, field, data_type
                )
            }
            ConfigIssue::DuplicateCalculatedField { name } => {
                write!(f, "Duplicate calculated field name: '{}'", name)
            }
            ConfigIssue::RedundantPlacement { usage, field } => {
                write!(f, "'{}' is used more than once as {}", field, usage)
            }
        }
    }
}

/// Validate a config against what the catalog has loaded.
///
/// Column references whose table has not been loaded yet are not reported.
pub fn validate(config: &ReportConfig, catalog: &SchemaCatalog) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if let Err(reason) = config.ensure_executable() {
        issues.push(ConfigIssue::NotExecutable(reason));
    }

    validate_calculated_names(config, &mut issues);
    validate_references(config, catalog, &mut issues);
    validate_aggregations(config, catalog, &mut issues);
    validate_redundancy(config, &mut issues);

    issues
}

fn validate_calculated_names(config: &ReportConfig, issues: &mut Vec<ConfigIssue>) {
    let mut seen = HashSet::new();
    for field in &config.calculated_fields {
        if !seen.insert(field.name.as_str()) {
            issues.push(ConfigIssue::DuplicateCalculatedField {
                name: field.name.clone(),
            });
        }
    }
}

fn usages(config: &ReportConfig) -> impl Iterator<Item = (&'static str, &FieldRef)> {
    config
        .columns
        .iter()
        .map(|c| ("column", &c.field))
        .chain(config.filters.iter().map(|f| ("filter", &f.field)))
        .chain(config.groups.iter().map(|g| ("group", &g.field)))
        .chain(config.sorts.iter().map(|s| ("sort", &s.field)))
        .chain(
            config
                .joins
                .iter()
                .flat_map(|j| [("join", &j.left), ("join", &j.right)]),
        )
}

fn validate_references(config: &ReportConfig, catalog: &SchemaCatalog, issues: &mut Vec<ConfigIssue>) {
    for (usage, field) in usages(config) {
        let resolved = match field {
            FieldRef::Calculated(name) => config.calculated_field(name).is_some(),
            FieldRef::Column { .. } => !matches!(catalog.resolve(field), Resolution::Missing),
        };
        if !resolved {
            issues.push(ConfigIssue::UnresolvedField {
                usage,
                field: field.clone(),
            });
        }
    }
}

fn validate_aggregations(config: &ReportConfig, catalog: &SchemaCatalog, issues: &mut Vec<ConfigIssue>) {
    for column in &config.columns {
        if !column.aggregation.requires_numeric() {
            continue;
        }
        if let Some(info) = catalog.column_info(&column.field) {
            if !info.is_numeric() {
                issues.push(ConfigIssue::NonNumericAggregation {
                    field: column.field.clone(),
                    aggregation: column.aggregation,
                    data_type: info.data_type.clone(),
                });
            }
        }
    }
}

fn validate_redundancy(config: &ReportConfig, issues: &mut Vec<ConfigIssue>) {
    let lists: [(&'static str, Vec<&FieldRef>); 4] = [
        ("column", config.columns.iter().map(|c| &c.field).collect()),
        ("filter", config.filters.iter().map(|f| &f.field).collect()),
        ("group", config.groups.iter().map(|g| &g.field).collect()),
        ("sort", config.sorts.iter().map(|s| &s.field).collect()),
    ];

    for (usage, fields) in lists {
        // Several filters on one field are a normal way to narrow results.
        if usage == "filter" {
            continue;
        }
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for field in fields {
            if !seen.insert(field) && reported.insert(field) {
                issues.push(ConfigIssue::RedundantPlacement {
                    usage,
                    field: field.clone(),
                });
            }
        }
    }
}
