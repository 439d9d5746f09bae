//! ODBC Notebook - an ODBC data source behind a JSON-RPC endpoint
//!
//! Exposes catalog browsing and paged query execution over JSON-RPC 2.0 on
//! HTTP or HTTPS, so that a notebook front end can work against any database
//! with an ODBC driver.

pub mod config;
pub mod odbc;
pub mod rpc;
pub mod server;
pub mod types;

pub use config::{ConfigLoader, LaunchArgs, ServerConfig};
pub use odbc::OdbcSession;
pub use rpc::{Dispatcher, NotebookBackend};
pub use server::NotebookServer;
pub use types::BridgeError;
