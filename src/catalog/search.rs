//! Filtering the catalog view by a search string.

use super::SchemaCatalog;
use crate::model::FieldRef;

/// Catalog entries matching a search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// Tables whose name matches.
    pub tables: Vec<String>,
    /// Loaded columns whose name (or table name) matches.
    pub columns: Vec<FieldRef>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty()
    }
}

impl SchemaCatalog {
    /// Case-insensitive substring search over loaded tables and columns.
    ///
    /// A blank query matches everything that is loaded. Results are sorted so
    /// the view is stable regardless of fetch order.
    pub fn search(&self, query: &str) -> SearchResults {
        let needle = query.trim().to_lowercase();
        let matches = |s: &str| needle.is_empty() || s.to_lowercase().contains(&needle);

        let mut results = SearchResults::default();
        if let Some(tables) = self.cached_tables() {
            results.tables = tables.iter().filter(|t| matches(t.as_str())).cloned().collect();
            results.tables.sort();
        }

        let mut tables_with_columns: Vec<&String> = self.columns.keys().collect();
        tables_with_columns.sort();
        for table in tables_with_columns {
            let table_matches = matches(table.as_str());
            for column in &self.columns[table] {
                if table_matches || matches(column.name.as_str()) {
                    results.columns.push(FieldRef::column(table.clone(), column.name.clone()));
                }
            }
        }
        results
    }
}
