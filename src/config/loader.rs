//! Settings file discovery
//!
//! Search order (first existing file wins):
//! 1. `--config <FILE>` (must exist)
//! 2. `./.odbc-notebook.toml` (project-specific)
//! 3. `$ODBC_NOTEBOOK_CONFIG`
//! 4. `~/.config/odbc-notebook/config.toml` (user-global)

use crate::config::UserConfig;
use crate::types::BridgeError;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_ENV_VAR: &str = "ODBC_NOTEBOOK_CONFIG";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the settings file, falling back to defaults when none exists.
    ///
    /// An explicitly requested file that does not exist is an error; the
    /// implicit locations are simply skipped.
    pub fn load(explicit: Option<&Path>) -> Result<(UserConfig, Option<PathBuf>), BridgeError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(BridgeError::ConfigError(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        Self::load_from_candidates(&Self::candidates())
    }

    pub fn load_from_candidates(
        candidates: &[PathBuf],
    ) -> Result<(UserConfig, Option<PathBuf>), BridgeError> {
        for path in candidates {
            if path.exists() {
                debug!("Loading settings from: {}", path.display());
                return Ok((Self::from_file(path)?, Some(path.clone())));
            }
        }

        debug!("No settings file found");
        Ok((UserConfig::default(), None))
    }

    pub fn from_file(path: &Path) -> Result<UserConfig, BridgeError> {
        let content = std::fs::read_to_string(path).map_err(|source| BridgeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| {
            BridgeError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(".odbc-notebook.toml"));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            candidates.push(PathBuf::from(config_path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("odbc-notebook").join("config.toml"));
        }

        candidates
    }
}
