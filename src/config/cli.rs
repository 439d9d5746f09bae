//! Command-line arguments
//!
//! `clap` reports malformed arguments (missing `-c`, repeated flags, a port
//! outside 1..=65535, `-s` with fewer than three values) on stderr and exits
//! non-zero before anything else happens.

use crate::config::defaults::{
    DEFAULT_BIND_ADDRESS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_PORT,
    DEFAULT_TLS_HANDSHAKE_TIMEOUT,
};
use crate::config::{ServerConfig, TlsSettings, UserConfig};
use crate::types::BridgeError;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// ODBC backend for the notebook protocol
///
/// Serves JSON-RPC over HTTP (or HTTPS with `-s`) and answers notebook
/// requests from an ODBC data source.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "odbc-server")]
#[command(author, version, about, long_about = None)]
pub struct LaunchArgs {
    /// Port to listen on
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Serve over TLS using a PEM certificate chain, a PEM private key and
    /// the key's password (pass "" for an unencrypted key)
    #[arg(
        short = 's',
        long = "tls",
        num_args = 3,
        value_names = ["CERT", "KEY", "PASSWORD"],
        action = ArgAction::Set
    )]
    pub tls: Option<Vec<String>>,

    /// ODBC connection string, e.g. "DSN=sales;UID=alice;PWD=..."
    #[arg(short = 'c', long = "connection-string", value_name = "CONNECTION_STRING")]
    pub connection_string: String,

    /// Host or address to bind [default: localhost]
    #[arg(long, value_name = "HOST")]
    pub bind: Option<String>,

    /// Settings file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log to file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl LaunchArgs {
    /// Resolve the final configuration. CLI values win over the settings
    /// file, which wins over built-in defaults.
    pub fn to_server_config(&self, settings: &UserConfig) -> Result<ServerConfig, BridgeError> {
        let tls = match self.tls.as_deref() {
            None => None,
            Some([certificate, private_key, key_password]) => Some(TlsSettings {
                certificate: PathBuf::from(certificate),
                private_key: PathBuf::from(private_key),
                key_password: key_password.clone(),
            }),
            Some(other) => {
                return Err(BridgeError::ConfigError(format!(
                    "-s expects CERT KEY PASSWORD, got {} value(s)",
                    other.len()
                )))
            }
        };

        let bind_address = self
            .bind
            .clone()
            .or_else(|| settings.server.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let max_request_bytes = settings
            .server
            .max_request_bytes
            .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);
        if max_request_bytes == 0 {
            return Err(BridgeError::ConfigError(
                "server.max_request_bytes must be positive".to_string(),
            ));
        }

        let tls_handshake_timeout = settings
            .server
            .tls_handshake_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TLS_HANDSHAKE_TIMEOUT);

        Ok(ServerConfig {
            bind_address,
            port: self.port,
            tls,
            connection_string: self.connection_string.clone(),
            max_request_bytes,
            tls_handshake_timeout,
        })
    }

    pub fn effective_log_level(&self, settings: &UserConfig) -> String {
        self.log_level
            .clone()
            .or_else(|| settings.logging.level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }

    pub fn effective_log_file(&self, settings: &UserConfig) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| settings.logging.file.clone())
    }
}
