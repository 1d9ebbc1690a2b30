//! Error types for clipity

use crate::types::Dependency;
use crate::utils::text::truncate;
use thiserror::Error;

/// Longest message handed to the presentation layer
pub const MAX_MESSAGE_LEN: usize = 200;

/// Stable error codes for callers that branch on failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // External process errors
    ProcessFailure,
    InstallFailed,

    // Dependency errors
    MissingDependency,

    // Download errors
    FetchFailure,
    DownloadFailure,

    // User errors
    ValidationError,
    InvalidConfig,

    // System errors
    FileError,
}

/// Main error type for clipity
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("{program} failed{}: {}", exit_suffix(.code), or_no_output(.last_line))]
    ProcessFailure {
        program: String,
        code: Option<i32>,
        last_line: Option<String>,
    },

    #[error("{} is not installed", .dependency.label())]
    MissingDependency { dependency: Dependency },

    #[error("Could not install {}: {reason}", .dependency.label())]
    InstallFailed { dependency: Dependency, reason: String },

    #[error("Failed to fetch video info: {0}")]
    FetchFailure(String),

    #[error("Download failed: {0}")]
    DownloadFailure(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

fn or_no_output(line: &Option<String>) -> &str {
    line.as_deref().unwrap_or("no output")
}

impl ClipError {
    pub fn missing(dependency: Dependency) -> Self {
        Self::MissingDependency { dependency }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ProcessFailure { .. } => ErrorCode::ProcessFailure,
            Self::MissingDependency { .. } => ErrorCode::MissingDependency,
            Self::InstallFailed { .. } => ErrorCode::InstallFailed,
            Self::FetchFailure(_) => ErrorCode::FetchFailure,
            Self::DownloadFailure(_) => ErrorCode::DownloadFailure,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::File(_) => ErrorCode::FileError,
            Self::Json(_) => ErrorCode::InvalidConfig,
        }
    }

    /// Copy-paste command that fixes the failure by hand, if there is one
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            Self::MissingDependency { dependency } | Self::InstallFailed { dependency, .. } => {
                Some(dependency.manual_command())
            }
            _ => None,
        }
    }

    /// Message bounded for display
    pub fn user_message(&self) -> String {
        truncate(&self.to_string(), MAX_MESSAGE_LEN)
    }

    /// Last output line of a failed process, when this error came from one
    pub fn last_line(&self) -> Option<&str> {
        match self {
            Self::ProcessFailure { last_line, .. } => last_line.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipError>;
