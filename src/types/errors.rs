use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("ODBC error: {0}")]
    Odbc(#[from] odbc_api::Error),

    #[error("Cannot have active query when calling {0}()")]
    QueryActive(&'static str),

    #[error("Must have active query before calling {0}()")]
    NoActiveQuery(&'static str),

    #[error("Page size must be a positive integer")]
    InvalidPageSize,

    #[error("ODBC session closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
