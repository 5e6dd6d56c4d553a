//! `GlobalOpts`-aware wrappers over `casparlink-config`.

use std::path::PathBuf;

use casparlink_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config` if given, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(casparlink_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);
    let cfg = casparlink_config::load_config(Some(&path))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(cfg)
}
