//! Subcommand implementations.

pub mod batch;
pub mod config;
pub mod output;
pub mod parse;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use invox_core::InvoxConfig;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invox")
        .join("config.json")
}

/// Load the explicit config file, else the default one if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvoxConfig> {
    if let Some(path) = config_path {
        return Ok(InvoxConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(InvoxConfig::from_file(&default_path)?)
    } else {
        Ok(InvoxConfig::default())
    }
}
