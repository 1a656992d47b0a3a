//! SchemaProvider trait definition.
//!
//! The SchemaProvider trait abstracts over where catalog metadata comes
//! from. The primary implementation is [`crate::client::HttpClient`].

use async_trait::async_trait;

use super::types::{ColumnInfo, Connection};
use crate::client::ClientResult;

/// Trait for fetching connection, table and column metadata.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// List the connections available to the current user.
    async fn list_connections(&self) -> ClientResult<Vec<Connection>>;

    /// List table names for a connection.
    async fn list_tables(&self, connection_id: &str) -> ClientResult<Vec<String>>;

    /// List columns of one table.
    async fn list_columns(&self, connection_id: &str, table: &str)
        -> ClientResult<Vec<ColumnInfo>>;

    /// Fetch columns for several tables concurrently.
    ///
    /// Each table succeeds or fails on its own; the results keep the order
    /// of `tables`.
    async fn list_columns_batch(
        &self,
        connection_id: &str,
        tables: &[String],
    ) -> Vec<(String, ClientResult<Vec<ColumnInfo>>)> {
        let futures: Vec<_> = tables
            .iter()
            .map(|table| async move {
                let result = self.list_columns(connection_id, table).await;
                (table.clone(), result)
            })
            .collect();

        futures::future::join_all(futures).await
    }
}
