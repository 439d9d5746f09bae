//! Configuration for the ODBC notebook server
//!
//! Provides a 3-tier configuration hierarchy:
//! 1. Command-line flags (highest priority)
//! 2. Optional TOML settings file
//! 3. Built-in defaults (lowest priority)
//!
//! The connection string and TLS material only ever come from the command line.

pub mod cli;
pub mod defaults;
mod loader;
mod server_config;
mod user_config;

pub use cli::LaunchArgs;
pub use loader::{ConfigLoader, CONFIG_ENV_VAR};
pub use server_config::{redact_connection_string, ServerConfig, TlsSettings};
pub use user_config::{LoggingSettings, ServerSettings, UserConfig};
