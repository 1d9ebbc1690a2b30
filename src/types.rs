//! Type definitions for clipity
//!
//! Source of truth for all data structures.

use crate::error::{ClipError, Result};
use crate::utils::time::parse_optional;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================
// Dependency Types
// ============================================

const HOMEBREW_BOOTSTRAP: &str = r#"/bin/bash -c "$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)""#;

/// An external tool clipity needs on the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dependency {
    /// Homebrew, used to install the other two
    PackageManager,
    /// yt-dlp
    Downloader,
    /// ffmpeg, only ever handed to yt-dlp by path
    Transcoder,
}

impl Dependency {
    /// Install order. Later entries need the first one.
    pub const ALL: [Dependency; 3] = [Self::PackageManager, Self::Downloader, Self::Transcoder];

    /// Executable file name probed on disk
    pub fn binary_name(self) -> &'static str {
        match self {
            Self::PackageManager => "brew",
            Self::Downloader => "yt-dlp",
            Self::Transcoder => "ffmpeg",
        }
    }

    /// Name passed to `brew install`
    pub fn package_name(self) -> &'static str {
        match self {
            Self::PackageManager => "brew",
            Self::Downloader => "yt-dlp",
            Self::Transcoder => "ffmpeg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PackageManager => "Homebrew",
            Self::Downloader => "yt-dlp",
            Self::Transcoder => "FFmpeg",
        }
    }

    /// Command a user can paste into a terminal to install this by hand
    pub fn manual_command(self) -> &'static str {
        match self {
            Self::PackageManager => HOMEBREW_BOOTSTRAP,
            Self::Downloader => "brew install yt-dlp",
            Self::Transcoder => "brew install ffmpeg",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of which tools are installed and where.
///
/// Built fresh by every check; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyStatus {
    pub package_manager_path: Option<PathBuf>,
    pub downloader_path: Option<PathBuf>,
    pub transcoder_path: Option<PathBuf>,
}

impl DependencyStatus {
    pub fn path(&self, dependency: Dependency) -> Option<&Path> {
        match dependency {
            Dependency::PackageManager => self.package_manager_path.as_deref(),
            Dependency::Downloader => self.downloader_path.as_deref(),
            Dependency::Transcoder => self.transcoder_path.as_deref(),
        }
    }

    pub fn is_present(&self, dependency: Dependency) -> bool {
        self.path(dependency).is_some()
    }

    pub fn package_manager_present(&self) -> bool {
        self.is_present(Dependency::PackageManager)
    }

    pub fn downloader_present(&self) -> bool {
        self.is_present(Dependency::Downloader)
    }

    pub fn transcoder_present(&self) -> bool {
        self.is_present(Dependency::Transcoder)
    }

    pub fn all_present(&self) -> bool {
        Dependency::ALL.iter().all(|d| self.is_present(*d))
    }

    pub fn missing(&self) -> Vec<Dependency> {
        Dependency::ALL
            .into_iter()
            .filter(|d| !self.is_present(*d))
            .collect()
    }

    /// Path of `dependency`, or `MissingDependency`
    pub fn require(&self, dependency: Dependency) -> Result<PathBuf> {
        self.path(dependency)
            .map(Path::to_path_buf)
            .ok_or_else(|| ClipError::missing(dependency))
    }
}

// ============================================
// Install Step Types
// ============================================

/// Lifecycle of one dependency's install during a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StepStatus {
    #[default]
    Idle,
    Running { log: String },
    Done { log: String },
    Error { log: String },
    /// Already present, never attempted
    Skipped,
}

impl StepStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::Skipped => "skipped",
        }
    }

    pub fn log(&self) -> Option<&str> {
        match self {
            Self::Running { log } | Self::Done { log } | Self::Error { log } => Some(log),
            Self::Idle | Self::Skipped => None,
        }
    }
}

/// Step records for one install session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Steps {
    package_manager: StepStatus,
    downloader: StepStatus,
    transcoder: StepStatus,
}

impl Steps {
    pub fn get(&self, dependency: Dependency) -> &StepStatus {
        match dependency {
            Dependency::PackageManager => &self.package_manager,
            Dependency::Downloader => &self.downloader,
            Dependency::Transcoder => &self.transcoder,
        }
    }

    pub fn set(&mut self, dependency: Dependency, status: StepStatus) {
        let slot = match dependency {
            Dependency::PackageManager => &mut self.package_manager,
            Dependency::Downloader => &mut self.downloader,
            Dependency::Transcoder => &mut self.transcoder,
        };
        *slot = status;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dependency, &StepStatus)> {
        Dependency::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

// ============================================
// Video Types
// ============================================

/// Normalized metadata for one remote video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub title: String,
    pub duration_seconds: u64,
    pub thumbnail_url: String,
    pub uploader: String,
    pub source_url: String,
}

/// Output media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    #[default]
    Video,
    Audio,
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video (mp4)"),
            Self::Audio => f.write_str("audio (mp3)"),
        }
    }
}

/// What the user asked to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    /// Timestamp string, e.g. "1:30"
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub format: MediaFormat,
    /// Max video height, e.g. "1080" or "720p"
    pub quality_ceiling: Option<String>,
}

impl DownloadRequest {
    pub fn new(source_url: impl Into<String>, format: MediaFormat) -> Self {
        Self {
            source_url: source_url.into(),
            start_time: None,
            end_time: None,
            format,
            quality_ceiling: None,
        }
    }

    /// Resolve the trim range, rejecting empty or inverted ranges.
    ///
    /// Unparsable timestamps count as absent.
    pub fn trim_range(&self) -> Result<TrimRange> {
        let range = TrimRange {
            start: parse_optional(self.start_time.as_deref()),
            end: parse_optional(self.end_time.as_deref()),
        };

        if let Some(end) = range.end {
            let start = range.start.unwrap_or(0);
            if start >= end {
                return Err(ClipError::Validation(format!(
                    "Start time must be before end time ({}s >= {}s)",
                    start, end
                )));
            }
        }

        Ok(range)
    }
}

/// Clip bounds in seconds, half-open `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrimRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl TrimRange {
    /// True when the clip differs from the full video
    pub fn is_trimmed(&self) -> bool {
        self.start.unwrap_or(0) > 0 || self.end.is_some()
    }

    /// yt-dlp `--download-sections` value, e.g. `*10-inf`
    pub fn section_spec(&self) -> Option<String> {
        if !self.is_trimmed() {
            return None;
        }
        let end = self
            .end
            .map(|e| e.to_string())
            .unwrap_or_else(|| "inf".into());
        Some(format!("*{}-{}", self.start.unwrap_or(0), end))
    }
}

// ============================================
// Event Types
// ============================================

/// Download progress update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 0-100
    pub percent: u8,
    pub message: String,
}

/// Everything the presentation layer is told about
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    Dependencies(DependencyStatus),
    Step {
        dependency: Dependency,
        status: StepStatus,
    },
    Progress(Progress),
    Finished(PathBuf),
    Failed(String),
}

// ============================================
// Storage Types
// ============================================

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Clip output directory; empty means ~/Downloads/clipity
    pub download_dir: String,
    /// Default output format
    pub format: MediaFormat,
    /// Default max video height (default: "1080")
    pub quality_ceiling: Option<String>,
    /// Max recent clips kept (default: 50)
    pub max_history_entries: usize,
    /// Editor command (default: "nvim")
    pub editor: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: String::new(), // Set at runtime to ~/Downloads/clipity
            format: MediaFormat::default(),
            quality_ceiling: Some("1080".into()),
            max_history_entries: 50,
            editor: "nvim".into(),
        }
    }
}

/// A finished clip in the recent list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub source_url: String,
    pub path: PathBuf,
    /// Unix timestamp when saved
    pub timestamp: i64,
}
