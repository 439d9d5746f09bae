//! Shared error types

mod errors;

pub use errors::{BridgeError, Result};
