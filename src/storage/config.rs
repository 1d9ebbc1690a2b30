//! Configuration management

use crate::error::{ClipError, Result};
use crate::types::Config;
use crate::utils::paths::{default_download_dir, ensure_dir, expand_home, get_config_dir, get_config_path};
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

/// Load configuration from file, merging with defaults
pub async fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()).await
}

/// Load configuration from an explicit path
pub async fn load_config_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        debug!("no config at {}, using defaults", config_path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(config_path).await?;
    // Missing fields fall back to defaults via #[serde(default)]
    let config: Config = serde_json::from_str(&content).map_err(|e| {
        ClipError::InvalidConfig(format!("{}: {}", config_path.display(), e))
    })?;

    if config.max_history_entries == 0 {
        return Err(ClipError::InvalidConfig(
            "max_history_entries must be at least 1".into(),
        ));
    }

    Ok(config)
}

/// Where clips are written, resolving the empty default and `~`
pub fn resolve_download_dir(config: &Config) -> PathBuf {
    if config.download_dir.trim().is_empty() {
        default_download_dir()
    } else {
        expand_home(config.download_dir.trim())
    }
}

/// Save configuration to file
pub async fn save_config(config: &Config) -> Result<()> {
    ensure_dir(&get_config_dir()).await?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(get_config_path(), content).await?;
    Ok(())
}

/// Open config file in editor
pub async fn edit_config(editor: &str) -> Result<()> {
    let config_path = get_config_path();

    // Ensure config file exists
    if !config_path.exists() {
        save_config(&Config::default()).await?;
    }

    Command::new(editor)
        .arg(&config_path)
        .status()
        .await?;

    Ok(())
}
