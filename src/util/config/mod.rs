//! jmmc configuration
//!
//! Project-level configuration with CLI overrides.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Project-level (jmmc.toml, nearest ancestor of the input file)
//! 3. Default values
//! ```
//!
//! ```toml
//! [compiler]
//! register_allocation = true
//! fold_constants = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Project configuration file name
pub const CONFIG_FILE: &str = "jmmc.toml";

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Compiler settings
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Compiler pipeline switches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Run graph-coloring register allocation; otherwise slots follow
    /// declaration order
    #[serde(default = "default_register_allocation")]
    pub register_allocation: bool,
    /// Fold constant expressions before lowering
    #[serde(default)]
    pub fold_constants: bool,
}

fn default_register_allocation() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            register_allocation: true,
            fold_constants: false,
        }
    }
}

/// Parse configuration text
pub fn parse_config(content: &str) -> Result<ProjectConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::ParseError)
}

/// Nearest `jmmc.toml` in `start` or one of its ancestors
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Load the configuration file at `path`
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    debug!("loading configuration from {}", path.display());
    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    parse_config(&content)
}

/// Configuration for a project rooted at (or below) `dir`.
/// Returns the defaults if no file exists
pub fn load_for_dir(dir: &Path) -> Result<ProjectConfig, ConfigError> {
    match find_project_config(dir) {
        Some(path) => load_project_config(&path),
        None => Ok(ProjectConfig::default()),
    }
}

/// Save project configuration
pub fn save_project_config(
    path: &Path,
    config: &ProjectConfig,
) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config).map_err(ConfigError::SerializeError)?;
    fs::write(path, content).map_err(ConfigError::IoError)?;
    Ok(())
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Config parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Config serialize error: {0}")]
    SerializeError(toml::ser::Error),
}
