//! The thread that owns the ODBC connection
//!
//! A cursor borrows its connection, so the connection and the active query
//! live on one dedicated thread and everything else talks to it through a
//! command channel. The thread has two loops: `idle_loop` while no query is
//! open, and `query_loop` between `execute` and `finish`. Catalog listings
//! are served from both. The connection is dropped (and the driver handle
//! released) when the thread returns.

use crate::odbc::catalog::{read_text, Catalog};
use crate::odbc::types::{type_family, ColumnInfo, ResultColumn, Row, TableInfo, TableKind};
use crate::types::{BridgeError, Result};
use odbc_api::handles::{AsStatementRef, Statement, StatementImpl};
use odbc_api::{Cursor, CursorImpl, ResultSetMetadata};
use std::ops::ControlFlow;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

type OdbcConnection = odbc_api::Connection<'static>;
pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// Affected-row count reported when the driver does not know it.
pub const UNKNOWN_ROW_COUNT: i64 = -1;

pub(crate) enum Command {
    Tables {
        kind: TableKind,
        tx: Reply<Vec<TableInfo>>,
    },
    Columns {
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
        tx: Reply<Vec<ColumnInfo>>,
    },
    Execute {
        sql: String,
        tx: Reply<()>,
    },
    Metadata {
        tx: Reply<Vec<ResultColumn>>,
    },
    Count {
        tx: Reply<i64>,
    },
    Page {
        max: usize,
        tx: Reply<Vec<Row>>,
    },
    Finish {
        tx: Reply<()>,
    },
    Quit {
        tx: Reply<()>,
    },
}

pub(crate) fn worker_thread_main(
    connection_string: String,
    mut commands: mpsc::Receiver<Command>,
    ready: oneshot::Sender<Result<()>>,
) {
    let conn = match establish_connection(&connection_string) {
        Ok(conn) => {
            let _ = ready.send(Ok(()));
            conn
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    info!("ODBC connection established");
    idle_loop(&conn, &mut commands);
    drop(conn);
    info!("ODBC connection closed");
}

fn establish_connection(connection_string: &str) -> Result<OdbcConnection> {
    let env = odbc_api::environment()?;
    let conn = env.connect_with_connection_string(connection_string, Default::default())?;
    Ok(conn)
}

fn send_result<T>(tx: Reply<T>, result: Result<T>) {
    let _ = tx.send(result);
}

fn serve_catalog<K: Catalog>(catalog: &K, cmd: Command) -> Option<Command> {
    match cmd {
        Command::Tables { kind, tx } => send_result(tx, catalog.tables(kind)),
        Command::Columns {
            catalog: catalog_name,
            schema,
            table,
            tx,
        } => send_result(
            tx,
            catalog.columns(
                catalog_name.as_deref(),
                schema.as_deref(),
                table.as_deref(),
            ),
        ),
        other => return Some(other),
    }
    None
}

enum IdleStep {
    Continue,
    Execute { sql: String, tx: Reply<()> },
    Quit,
}

/// Handle one command while no query is open. `execute` is handed back to
/// the caller, which owns the connection.
fn idle_step<K: Catalog>(catalog: &K, cmd: Command) -> IdleStep {
    let Some(cmd) = serve_catalog(catalog, cmd) else {
        return IdleStep::Continue;
    };

    match cmd {
        Command::Execute { sql, tx } => return IdleStep::Execute { sql, tx },
        Command::Metadata { tx } => send_result(tx, Err(BridgeError::NoActiveQuery("metadata"))),
        Command::Count { tx } => send_result(tx, Err(BridgeError::NoActiveQuery("count"))),
        Command::Page { tx, .. } => send_result(tx, Err(BridgeError::NoActiveQuery("page"))),
        Command::Finish { tx } => send_result(tx, Err(BridgeError::NoActiveQuery("finish"))),
        Command::Quit { tx } => {
            send_result(tx, Ok(()));
            return IdleStep::Quit;
        }
        Command::Tables { .. } | Command::Columns { .. } => {}
    }
    IdleStep::Continue
}

fn idle_loop(conn: &OdbcConnection, commands: &mut mpsc::Receiver<Command>) {
    while let Some(cmd) = commands.blocking_recv() {
        match idle_step(conn, cmd) {
            IdleStep::Continue => {}
            IdleStep::Execute { sql, tx } => {
                if run_query(conn, &sql, tx, commands).is_break() {
                    return;
                }
            }
            IdleStep::Quit => return,
        }
    }

    debug!("Session handle dropped; leaving idle loop");
}

/// Execute `sql` and serve commands against its result until `finish`.
///
/// Breaks when the session should end (the command channel closed while the
/// query was open). A failed statement replies with the error and continues
/// idle.
fn run_query(
    conn: &OdbcConnection,
    sql: &str,
    tx: Reply<()>,
    commands: &mut mpsc::Receiver<Command>,
) -> ControlFlow<()> {
    debug!("Executing query ({} bytes)", sql.len());

    let mut statement = match conn.preallocate() {
        Ok(statement) => statement,
        Err(e) => {
            send_result(tx, Err(e.into()));
            return ControlFlow::Continue(());
        }
    };

    match statement.execute(sql, ()) {
        Ok(Some(mut cursor)) => {
            let columns = match describe_columns(&mut cursor) {
                Ok(columns) => columns,
                Err(e) => {
                    send_result(tx, Err(e));
                    return ControlFlow::Continue(());
                }
            };
            let rows_affected = extract_rows_affected(&mut cursor);
            send_result(tx, Ok(()));
            return query_loop(
                conn,
                ActiveQuery {
                    cursor: Some(cursor),
                    columns,
                    rows_affected,
                    exhausted: false,
                },
                commands,
            );
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Query failed: {}", e);
            send_result(tx, Err(e.into()));
            return ControlFlow::Continue(());
        }
    }

    // No result set (DDL/DML): the query is still "open" so count() works.
    let rows_affected = extract_rows_affected(&mut statement);
    send_result(tx, Ok(()));
    query_loop(
        conn,
        ActiveQuery::<CursorImpl<StatementImpl<'static>>> {
            cursor: None,
            columns: Vec::new(),
            rows_affected,
            exhausted: true,
        },
        commands,
    )
}

struct ActiveQuery<C> {
    cursor: Option<C>,
    columns: Vec<ResultColumn>,
    rows_affected: i64,
    exhausted: bool,
}

fn query_loop<C: Cursor, K: Catalog>(
    catalog: &K,
    mut query: ActiveQuery<C>,
    commands: &mut mpsc::Receiver<Command>,
) -> ControlFlow<()> {
    while let Some(cmd) = commands.blocking_recv() {
        let Some(cmd) = serve_catalog(catalog, cmd) else {
            continue;
        };

        match cmd {
            Command::Execute { tx, .. } => {
                send_result(tx, Err(BridgeError::QueryActive("execute")))
            }
            Command::Metadata { tx } => send_result(tx, Ok(query.columns.clone())),
            Command::Count { tx } => send_result(tx, Ok(query.rows_affected)),
            Command::Page { max, tx } => send_result(tx, query.fetch_page(max)),
            Command::Finish { tx } => {
                drop(query);
                send_result(tx, Ok(()));
                return ControlFlow::Continue(());
            }
            Command::Quit { tx } => send_result(tx, Err(BridgeError::QueryActive("quit"))),
            Command::Tables { .. } | Command::Columns { .. } => {}
        }
    }

    debug!("Session handle dropped with an open query");
    ControlFlow::Break(())
}

impl<C: Cursor> ActiveQuery<C> {
    fn fetch_page(&mut self, max: usize) -> Result<Vec<Row>> {
        if max == 0 {
            return Err(BridgeError::InvalidPageSize);
        }

        let mut page = Vec::new();
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(page);
        };
        if self.exhausted {
            return Ok(page);
        }

        let mut buf = Vec::new();
        while page.len() < max {
            let Some(mut row) = cursor.next_row()? else {
                self.exhausted = true;
                break;
            };

            let mut record = Row::new();
            for (index, column) in self.columns.iter().enumerate() {
                let value = read_text(&mut row, (index + 1) as u16, &mut buf)?;
                record.insert(
                    column.column.clone(),
                    value.map_or(serde_json::Value::Null, serde_json::Value::String),
                );
            }
            page.push(record);
        }

        Ok(page)
    }
}

fn describe_columns<C: ResultSetMetadata>(cursor: &mut C) -> Result<Vec<ResultColumn>> {
    let count = cursor.num_result_cols()?;
    let mut columns = Vec::with_capacity(count.max(0) as usize);

    for index in 1..=count {
        let index = index as u16;
        let name = cursor.col_name(index)?;
        let data_type = cursor.col_data_type(index)?;
        columns.push(ResultColumn {
            column: if name.is_empty() {
                format!("col{}", index - 1)
            } else {
                name
            },
            datatype: type_family(&data_type).to_string(),
        });
    }

    Ok(columns)
}

/// `SQLRowCount` for the last statement; `-1` when the driver cannot tell.
fn extract_rows_affected<S: AsStatementRef>(stmt: &mut S) -> i64 {
    let mut stmt_ref = stmt.as_stmt_ref();
    match stmt_ref.row_count().into_result(&stmt_ref) {
        Ok(count) => i64::try_from(count).unwrap_or(UNKNOWN_ROW_COUNT),
        Err(e) => {
            warn!("Failed to get row count: {}", e);
            UNKNOWN_ROW_COUNT
        }
    }
}
