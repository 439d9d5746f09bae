//! ODBC session and catalog access

mod catalog;
pub mod session;
pub mod types;
mod worker;

pub use session::OdbcSession;
pub use types::{ColumnInfo, ResultColumn, Row, TableInfo, TableKind};
pub use worker::UNKNOWN_ROW_COUNT;
