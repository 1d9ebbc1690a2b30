//! Output classifier - pulls progress and file paths out of yt-dlp output
//!
//! Kept apart from process handling so the patterns can be tested on plain
//! strings and swapped if yt-dlp changes its wording.

use regex::Regex;
use std::path::PathBuf;

/// Interprets one line of downloader output
pub trait OutputClassifier {
    /// Whole-number percentage (0-100) if the line reports progress
    fn extract_progress(&self, line: &str) -> Option<u8>;

    /// File the downloader announced it is writing or has produced
    fn extract_artifact_path(&self, line: &str) -> Option<PathBuf>;
}

/// Patterns for yt-dlp's `--newline` output
#[derive(Debug, Clone)]
pub struct YtDlpClassifier {
    percent: Regex,
    destination: Regex,
    merged: Regex,
}

impl Default for YtDlpClassifier {
    fn default() -> Self {
        Self {
            percent: Regex::new(r"^\s*\[download\]\s+(\d+(?:\.\d+)?)%").expect("Invalid regex"),
            destination: Regex::new(r"Destination:\s*(.+)$").expect("Invalid regex"),
            merged: Regex::new(r#"Merging formats into "(.+)"\s*$"#).expect("Invalid regex"),
        }
    }
}

impl OutputClassifier for YtDlpClassifier {
    fn extract_progress(&self, line: &str) -> Option<u8> {
        let captures = self.percent.captures(line)?;
        let value: f64 = captures.get(1)?.as_str().parse().ok()?;
        Some(value.round().clamp(0.0, 100.0) as u8)
    }

    fn extract_artifact_path(&self, line: &str) -> Option<PathBuf> {
        let captures = self
            .merged
            .captures(line)
            .or_else(|| self.destination.captures(line))?;
        let path = captures.get(1)?.as_str().trim();
        if path.is_empty() {
            return None;
        }
        Some(PathBuf::from(path))
    }
}
