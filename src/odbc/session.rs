//! Async handle to the ODBC session worker

use crate::odbc::types::{ColumnInfo, ResultColumn, Row, TableInfo, TableKind};
use crate::odbc::worker::{worker_thread_main, Command, Reply};
use crate::types::{BridgeError, Result};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

const COMMAND_QUEUE_DEPTH: usize = 64;

/// One ODBC connection plus its active query, driven from async code.
///
/// Calls are queued and executed in order on the worker thread. Dropping
/// the last handle closes the channel, which ends the worker and releases
/// the connection.
#[derive(Debug)]
pub struct OdbcSession {
    command_tx: mpsc::Sender<Command>,
}

impl OdbcSession {
    /// Connect with `connection_string` and wait until the driver manager
    /// has accepted or rejected it.
    pub async fn open(connection_string: &str) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();
        let connection_string = connection_string.to_string();

        thread::Builder::new()
            .name("odbc-session".into())
            .spawn(move || worker_thread_main(connection_string, command_rx, ready_tx))?;

        ready_rx.await.map_err(|_| BridgeError::SessionClosed)??;
        info!("ODBC session ready");

        Ok(Self { command_tx })
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(build(tx))
            .await
            .map_err(|_| BridgeError::SessionClosed)?;
        rx.await.map_err(|_| BridgeError::SessionClosed)?
    }

    pub async fn tables(&self) -> Result<Vec<TableInfo>> {
        self.request(|tx| Command::Tables {
            kind: TableKind::Table,
            tx,
        })
        .await
    }

    pub async fn views(&self) -> Result<Vec<TableInfo>> {
        self.request(|tx| Command::Tables {
            kind: TableKind::View,
            tx,
        })
        .await
    }

    pub async fn columns(
        &self,
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
    ) -> Result<Vec<ColumnInfo>> {
        self.request(|tx| Command::Columns {
            catalog,
            schema,
            table,
            tx,
        })
        .await
    }

    pub async fn execute(&self, sql: String) -> Result<()> {
        self.request(|tx| Command::Execute { sql, tx }).await
    }

    pub async fn metadata(&self) -> Result<Vec<ResultColumn>> {
        self.request(|tx| Command::Metadata { tx }).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.request(|tx| Command::Count { tx }).await
    }

    pub async fn page(&self, max: usize) -> Result<Vec<Row>> {
        self.request(|tx| Command::Page { max, tx }).await
    }

    pub async fn finish(&self) -> Result<()> {
        self.request(|tx| Command::Finish { tx }).await
    }

    /// Close the connection. Later calls fail with [`BridgeError::SessionClosed`].
    pub async fn quit(&self) -> Result<()> {
        self.request(|tx| Command::Quit { tx }).await
    }
}
