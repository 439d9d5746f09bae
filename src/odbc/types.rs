//! Values exchanged between the ODBC session and the protocol layer
//!
//! Field names are part of the notebook wire format.

use odbc_api::DataType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One data row: column name to text value, in column order. NULL is `null`.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub column: String,
    /// Driver-specific `TYPE_NAME` from `SQLColumns`.
    pub datatype: String,
}

/// A column of the active result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub column: String,
    pub datatype: String,
}

/// Which `TABLE_TYPE` a catalog listing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    pub fn matches(self, table_type: &str) -> bool {
        let wanted = match self {
            TableKind::Table => "TABLE",
            TableKind::View => "VIEW",
        };
        table_type.trim().eq_ignore_ascii_case(wanted)
    }
}

/// Coarse type family reported by `metadata()` for a result column.
pub fn type_family(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => "int",
        DataType::Real | DataType::Float { .. } | DataType::Double => "float",
        DataType::Decimal { .. } | DataType::Numeric { .. } => "Decimal",
        DataType::Bit => "bool",
        DataType::Date => "date",
        DataType::Time { .. } => "time",
        DataType::Timestamp { .. } => "datetime",
        DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
            "bytes"
        }
        _ => "str",
    }
}
