pub mod ask;
pub mod config_cmd;
pub mod serve;
pub mod transpile;

use coderelay_config::AppConfig;
use std::path::{Path, PathBuf};

/// The config file in effect: `--config` if given, else the default location.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config file plus environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with_env(&config_file(path))
        .map_err(|e| format!("Failed to load config: {e}").into())
}
