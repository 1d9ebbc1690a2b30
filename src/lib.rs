//! clipity library
//!
//! Detects and installs the external tools a clip needs (Homebrew, yt-dlp,
//! ffmpeg), fetches video metadata, and runs trimmed downloads while
//! reporting progress.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;
