//! Initialize the configuration directory: create `~/.trainer` and a default `config.json`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default config written by `trainer init`: empty, so every setting falls back to its default.
/// The API key is expected from the environment.
const DEFAULT_CONFIG: &str = "{}\n";

/// Create the config directory and default config file if they do not exist.
/// Returns the config directory. An existing config file is left untouched.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}
