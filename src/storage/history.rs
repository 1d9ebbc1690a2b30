//! Recent clips log

use crate::error::Result;
use crate::types::{HistoryEntry, VideoDescriptor};
use crate::utils::paths::ensure_dir;
use chrono::Utc;
use log::warn;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Finished clips, newest first
pub struct ClipHistory {
    path: PathBuf,
    max_entries: usize,
    entries: Vec<HistoryEntry>,
}

impl ClipHistory {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
            entries: Vec::new(),
        }
    }

    /// Load history from file
    pub async fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            self.entries = Vec::new();
            return Ok(());
        }

        let content = fs::read_to_string(&self.path).await?;
        match serde_json::from_str(&content) {
            Ok(entries) => self.entries = entries,
            Err(e) => {
                // Keep the unreadable file; the next save would overwrite it
                let backup = self.path.with_extension("json.bak");
                warn!(
                    "unreadable history at {} ({}), moved to {}",
                    self.path.display(),
                    e,
                    backup.display()
                );
                fs::rename(&self.path, &backup).await?;
                self.entries = Vec::new();
            }
        }
        Ok(())
    }

    /// Save history to file
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent).await?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Record a finished clip
    pub async fn add(&mut self, video: &VideoDescriptor, path: &Path) -> Result<()> {
        let entry = HistoryEntry {
            title: video.title.clone(),
            source_url: video.source_url.clone(),
            path: path.to_path_buf(),
            timestamp: Utc::now().timestamp(),
        };

        // Same file written again replaces the old entry
        self.entries.retain(|e| e.path != entry.path);
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);

        self.save().await
    }

    /// Get all history entries
    pub fn get_all(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Clear all history
    pub async fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}
