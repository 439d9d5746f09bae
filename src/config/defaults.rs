//! Built-in defaults
//!
//! Used when neither the command line nor the settings file provides a value.

use std::time::Duration;

/// Port the notebook protocol listens on unless `-p` says otherwise.
pub const DEFAULT_PORT: u16 = 1995;

pub const DEFAULT_BIND_ADDRESS: &str = "localhost";

/// 2 MiB, the same ceiling axum applies to request bodies out of the box.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 2 * 1024 * 1024;

pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_LOG_LEVEL: &str = "info";
