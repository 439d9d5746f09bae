//! The data source behind the notebook methods

use crate::odbc::{ColumnInfo, OdbcSession, ResultColumn, Row, TableInfo};
use crate::types::Result;
use async_trait::async_trait;

/// Operations a notebook client can invoke.
///
/// [`OdbcSession`] is the production implementation.
#[async_trait]
pub trait NotebookBackend: Send + Sync {
    async fn tables(&self) -> Result<Vec<TableInfo>>;

    async fn views(&self) -> Result<Vec<TableInfo>>;

    async fn columns(
        &self,
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
    ) -> Result<Vec<ColumnInfo>>;

    /// Open the active query. Fails if one is already open.
    async fn execute(&self, sql: String) -> Result<()>;

    async fn metadata(&self) -> Result<Vec<ResultColumn>>;

    async fn count(&self) -> Result<i64>;

    /// Up to `max` further rows; empty once the result set is exhausted.
    async fn page(&self, max: usize) -> Result<Vec<Row>>;

    async fn finish(&self) -> Result<()>;

    /// Release the data source. Fails while a query is open.
    async fn quit(&self) -> Result<()>;
}

#[async_trait]
impl NotebookBackend for OdbcSession {
    async fn tables(&self) -> Result<Vec<TableInfo>> {
        OdbcSession::tables(self).await
    }

    async fn views(&self) -> Result<Vec<TableInfo>> {
        OdbcSession::views(self).await
    }

    async fn columns(
        &self,
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
    ) -> Result<Vec<ColumnInfo>> {
        OdbcSession::columns(self, catalog, schema, table).await
    }

    async fn execute(&self, sql: String) -> Result<()> {
        OdbcSession::execute(self, sql).await
    }

    async fn metadata(&self) -> Result<Vec<ResultColumn>> {
        OdbcSession::metadata(self).await
    }

    async fn count(&self) -> Result<i64> {
        OdbcSession::count(self).await
    }

    async fn page(&self, max: usize) -> Result<Vec<Row>> {
        OdbcSession::page(self, max).await
    }

    async fn finish(&self) -> Result<()> {
        OdbcSession::finish(self).await
    }

    async fn quit(&self) -> Result<()> {
        OdbcSession::quit(self).await
    }
}
