//! Dependency orchestration and download execution

pub mod classifier;
pub mod dependencies;
pub mod downloader;
pub mod installer;
pub mod metadata;
pub mod process;

#[cfg(test)]
pub(crate) mod testing;
