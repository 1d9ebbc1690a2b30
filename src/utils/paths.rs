//! Path utilities for clipity
//!
//! Respects XDG Base Directory Specification

use crate::error::Result;
use std::env;
use std::path::PathBuf;
use tokio::fs;

const APP_NAME: &str = "clipity";

/// Get config directory path
/// Respects XDG_CONFIG_HOME, defaults to ~/.config/clipity
pub fn get_config_dir() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| home_dir().join(".config"));

    base.join(APP_NAME)
}

/// Get cache directory path
/// Respects XDG_CACHE_HOME, defaults to ~/.cache/clipity
pub fn get_cache_dir() -> PathBuf {
    let base = env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| home_dir().join(".cache"));

    base.join(APP_NAME)
}

/// Default clip output directory, ~/Downloads/clipity
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| home_dir().join("Downloads"))
        .join(APP_NAME)
}

/// Get history file path
pub fn get_history_path() -> PathBuf {
    get_cache_dir().join("history.json")
}

/// Get config file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Expand a leading `~/` against the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Ensure a directory exists
pub async fn ensure_dir(path: &std::path::Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    Ok(())
}

/// Ensure all required app directories exist
pub async fn ensure_app_dirs() -> Result<()> {
    ensure_dir(&get_config_dir()).await?;
    ensure_dir(&get_cache_dir()).await?;
    Ok(())
}
