//! Schema catalog.
//!
//! Fetches connection → table → column metadata on demand and caches it for
//! the currently selected connection. Switching connections drops the whole
//! cache so schema from one data source never shows up under another.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SchemaCatalog                            │
//! │  connection_id ─┬─ tables: [String]              (cached once)  │
//! │                 └─ columns: table -> [ColumnInfo] (per table)   │
//! │  errors: region -> message   (scoped, never clears good data)   │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 SchemaProvider (HttpClient, mocks)              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures are recorded per region (connections list, table list, or one
//! table's columns). A failed refresh of a table that was loaded before
//! keeps serving the previous columns.

mod provider;
mod search;
mod types;

pub use provider::SchemaProvider;
pub use search::SearchResults;
pub use types::{ColumnInfo, Connection};

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::client::ClientError;
use crate::model::FieldRef;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// The part of the catalog view a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogRegion {
    Connections,
    Tables,
    Table(String),
}

impl fmt::Display for CatalogRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogRegion::Connections => f.write_str("connections"),
            CatalogRegion::Tables => f.write_str("tables"),
            CatalogRegion::Table(name) => write!(f, "columns of '{}'", name),
        }
    }
}

/// Errors raised by catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("no connection selected")]
    NoConnection,

    #[error("failed to load {region}: {source}")]
    Fetch {
        region: CatalogRegion,
        #[source]
        source: ClientError,
    },
}

impl CatalogError {
    pub fn region(&self) -> Option<&CatalogRegion> {
        match self {
            CatalogError::NoConnection => None,
            CatalogError::Fetch { region, .. } => Some(region),
        }
    }
}

/// How a column reference relates to what the catalog has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The column exists in the loaded metadata.
    Found(&'a ColumnInfo),
    /// Metadata is loaded and does not contain the table or column.
    Missing,
    /// The relevant metadata has not been fetched yet.
    Unloaded,
}

/// Per-table outcome of [`SchemaCatalog::load_columns_batch`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

/// Cached schema metadata for the active connection.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    connections: Vec<Connection>,
    connection_id: Option<String>,
    tables: Option<Vec<String>>,
    columns: HashMap<String, Vec<ColumnInfo>>,
    errors: HashMap<CatalogRegion, String>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Select the active connection. Returns `true` when the selection
    /// changed, in which case every cached table and column is dropped.
    pub fn select_connection(&mut self, connection_id: Option<&str>) -> bool {
        if self.connection_id.as_deref() == connection_id {
            return false;
        }
        debug!(
            from = ?self.connection_id,
            to = ?connection_id,
            "switching connection, invalidating catalog cache"
        );
        self.connection_id = connection_id.map(str::to_string);
        self.tables = None;
        self.columns.clear();
        self.errors
            .retain(|region, _| *region == CatalogRegion::Connections);
        true
    }

    /// Fetch the connection list. On failure the previous list is kept.
    pub async fn refresh_connections<P>(&mut self, provider: &P) -> CatalogResult<&[Connection]>
    where
        P: SchemaProvider + ?Sized,
    {
        match provider.list_connections().await {
            Ok(connections) => {
                debug!(count = connections.len(), "loaded connections");
                self.connections = connections;
                self.errors.remove(&CatalogRegion::Connections);
                Ok(&self.connections)
            }
            Err(source) => Err(self.record(CatalogRegion::Connections, source)),
        }
    }

    /// Table names for the active connection, fetched once per selection.
    pub async fn tables<P>(&mut self, provider: &P) -> CatalogResult<&[String]>
    where
        P: SchemaProvider + ?Sized,
    {
        if self.tables.is_none() {
            let connection_id = self.require_connection()?;
            match provider.list_tables(&connection_id).await {
                Ok(tables) => {
                    debug!(connection = %connection_id, count = tables.len(), "loaded tables");
                    self.tables = Some(tables);
                    self.errors.remove(&CatalogRegion::Tables);
                }
                Err(source) => return Err(self.record(CatalogRegion::Tables, source)),
            }
        }
        Ok(self.tables.as_deref().unwrap_or_default())
    }

    /// Columns of one table, fetched once per selection.
    pub async fn columns<P>(&mut self, provider: &P, table: &str) -> CatalogResult<&[ColumnInfo]>
    where
        P: SchemaProvider + ?Sized,
    {
        if !self.columns.contains_key(table) {
            self.fetch_columns(provider, table).await?;
        }
        Ok(self.cached_columns(table).unwrap_or_default())
    }

    /// Re-fetch one table's columns. A failure keeps the previously cached
    /// columns in place.
    pub async fn refresh_table<P>(&mut self, provider: &P, table: &str) -> CatalogResult<&[ColumnInfo]>
    where
        P: SchemaProvider + ?Sized,
    {
        self.fetch_columns(provider, table).await?;
        Ok(self.cached_columns(table).unwrap_or_default())
    }

    /// Fetch columns for every table in `tables` that is not cached yet,
    /// concurrently. Each table's failure is recorded in its own region.
    pub async fn load_columns_batch<P>(
        &mut self,
        provider: &P,
        tables: &[String],
    ) -> CatalogResult<BatchOutcome>
    where
        P: SchemaProvider + ?Sized,
    {
        let connection_id = self.require_connection()?;
        let missing: Vec<String> = tables
            .iter()
            .filter(|t| !self.columns.contains_key(t.as_str()))
            .cloned()
            .collect();

        let mut outcome = BatchOutcome::default();
        for (table, result) in provider.list_columns_batch(&connection_id, &missing).await {
            match result {
                Ok(columns) => {
                    self.errors.remove(&CatalogRegion::Table(table.clone()));
                    self.columns.insert(table.clone(), columns);
                    outcome.loaded.push(table);
                }
                Err(source) => {
                    self.record(CatalogRegion::Table(table.clone()), source);
                    outcome.failed.push(table);
                }
            }
        }
        Ok(outcome)
    }

    async fn fetch_columns<P>(&mut self, provider: &P, table: &str) -> CatalogResult<()>
    where
        P: SchemaProvider + ?Sized,
    {
        let connection_id = self.require_connection()?;
        match provider.list_columns(&connection_id, table).await {
            Ok(columns) => {
                debug!(connection = %connection_id, table, count = columns.len(), "loaded columns");
                self.errors.remove(&CatalogRegion::Table(table.to_string()));
                self.columns.insert(table.to_string(), columns);
                Ok(())
            }
            Err(source) => Err(self.record(CatalogRegion::Table(table.to_string()), source)),
        }
    }

    fn require_connection(&self) -> CatalogResult<String> {
        self.connection_id.clone().ok_or(CatalogError::NoConnection)
    }

    fn record(&mut self, region: CatalogRegion, source: ClientError) -> CatalogError {
        warn!(%region, error = %source, "catalog fetch failed");
        self.errors.insert(region.clone(), source.to_string());
        CatalogError::Fetch { region, source }
    }

    pub fn cached_tables(&self) -> Option<&[String]> {
        self.tables.as_deref()
    }

    pub fn cached_columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.columns.get(table).map(Vec::as_slice)
    }

    /// The error message currently shown for a region, if any.
    pub fn error(&self, region: &CatalogRegion) -> Option<&str> {
        self.errors.get(region).map(String::as_str)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Look a column reference up in the loaded metadata.
    ///
    /// Calculated fields are not catalog entries and always resolve to
    /// [`Resolution::Missing`] here.
    pub fn resolve(&self, field: &FieldRef) -> Resolution<'_> {
        let FieldRef::Column { table, column } = field else {
            return Resolution::Missing;
        };

        if let Some(columns) = self.columns.get(table) {
            return match columns.iter().find(|c| &c.name == column) {
                Some(info) => Resolution::Found(info),
                None => Resolution::Missing,
            };
        }

        match &self.tables {
            Some(tables) if !tables.iter().any(|t| t == table) => Resolution::Missing,
            _ => Resolution::Unloaded,
        }
    }

    pub fn column_info(&self, field: &FieldRef) -> Option<&ColumnInfo> {
        match self.resolve(field) {
            Resolution::Found(info) => Some(info),
            _ => None,
        }
    }
}
