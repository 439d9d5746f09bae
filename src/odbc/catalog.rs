//! Catalog queries (`SQLTables`, `SQLColumns`)

use crate::odbc::types::{ColumnInfo, TableInfo, TableKind};
use crate::types::Result;
use odbc_api::{Cursor, CursorRow};

type OdbcConnection = odbc_api::Connection<'static>;

// Result set layout shared by SQLTables and SQLColumns.
const CATALOG_COLUMN: u16 = 1;
const SCHEMA_COLUMN: u16 = 2;
const TABLE_COLUMN: u16 = 3;
const TABLE_TYPE_COLUMN: u16 = 4;
const COLUMN_NAME_COLUMN: u16 = 4;
const TYPE_NAME_COLUMN: u16 = 6;

const MATCH_ALL: &str = "%";

/// Catalog listings the session worker serves in any state.
pub(crate) trait Catalog {
    fn tables(&self, kind: TableKind) -> Result<Vec<TableInfo>>;

    fn columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Vec<ColumnInfo>>;
}

impl Catalog for OdbcConnection {
    fn tables(&self, kind: TableKind) -> Result<Vec<TableInfo>> {
        list_tables(self, kind)
    }

    fn columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Vec<ColumnInfo>> {
        list_columns(self, catalog, schema, table)
    }
}

fn list_tables(conn: &OdbcConnection, kind: TableKind) -> Result<Vec<TableInfo>> {
    let mut cursor = conn.tables("", MATCH_ALL, MATCH_ALL, "")?;
    let mut buf = Vec::new();
    let mut tables = Vec::new();

    while let Some(mut row) = cursor.next_row()? {
        let table_type = read_text(&mut row, TABLE_TYPE_COLUMN, &mut buf)?.unwrap_or_default();
        if !kind.matches(&table_type) {
            continue;
        }

        tables.push(TableInfo {
            catalog: read_text(&mut row, CATALOG_COLUMN, &mut buf)?.unwrap_or_default(),
            schema: read_text(&mut row, SCHEMA_COLUMN, &mut buf)?.unwrap_or_default(),
            table: read_text(&mut row, TABLE_COLUMN, &mut buf)?.unwrap_or_default(),
        });
    }

    Ok(tables)
}

/// A `None` catalog is sent as the empty string, which most drivers treat as
/// the current catalog. `None` schema or table match everything.
fn list_columns(
    conn: &OdbcConnection,
    catalog: Option<&str>,
    schema: Option<&str>,
    table: Option<&str>,
) -> Result<Vec<ColumnInfo>> {
    let mut cursor = conn.columns(
        catalog.unwrap_or(""),
        schema.unwrap_or(MATCH_ALL),
        table.unwrap_or(MATCH_ALL),
        MATCH_ALL,
    )?;
    let mut buf = Vec::new();
    let mut columns = Vec::new();

    while let Some(mut row) = cursor.next_row()? {
        columns.push(ColumnInfo {
            catalog: read_text(&mut row, CATALOG_COLUMN, &mut buf)?.unwrap_or_default(),
            schema: read_text(&mut row, SCHEMA_COLUMN, &mut buf)?.unwrap_or_default(),
            table: read_text(&mut row, TABLE_COLUMN, &mut buf)?.unwrap_or_default(),
            column: read_text(&mut row, COLUMN_NAME_COLUMN, &mut buf)?.unwrap_or_default(),
            datatype: read_text(&mut row, TYPE_NAME_COLUMN, &mut buf)?.unwrap_or_default(),
        });
    }

    Ok(columns)
}

/// Fetch one column of the current row as text. `None` means SQL NULL.
pub(crate) fn read_text(
    row: &mut CursorRow<'_>,
    col_idx: u16,
    buf: &mut Vec<u8>,
) -> Result<Option<String>> {
    buf.clear();
    if row.get_text(col_idx, buf)? {
        Ok(Some(String::from_utf8_lossy(buf).into_owned()))
    } else {
        Ok(None)
    }
}
