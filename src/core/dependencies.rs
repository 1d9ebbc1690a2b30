//! Binary locator and dependency checker
//!
//! Presence is decided by looking at a fixed list of install directories,
//! never by PATH lookup, so the answer doesn't depend on the caller's shell.

use crate::types::{Dependency, DependencyStatus};
use log::debug;
use std::path::PathBuf;

/// Install directories, highest priority first: ARM Homebrew, Intel Homebrew, system
pub const SEARCH_DIRS: [&str; 3] = ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

/// Finds executables by name in a fixed directory list
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    dirs: Vec<PathBuf>,
}

impl Default for BinaryLocator {
    fn default() -> Self {
        Self::new(SEARCH_DIRS.iter().map(PathBuf::from).collect())
    }
}

impl BinaryLocator {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First `dir/name` that exists as a file
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// Builds a fresh `DependencyStatus` on every call
#[derive(Debug, Clone, Default)]
pub struct DependencyChecker {
    locator: BinaryLocator,
}

impl DependencyChecker {
    pub fn new(locator: BinaryLocator) -> Self {
        Self { locator }
    }

    pub fn check(&self) -> DependencyStatus {
        let status = DependencyStatus {
            package_manager_path: self.locate(Dependency::PackageManager),
            downloader_path: self.locate(Dependency::Downloader),
            transcoder_path: self.locate(Dependency::Transcoder),
        };
        debug!("dependency check: {:?}", status);
        status
    }

    fn locate(&self, dependency: Dependency) -> Option<PathBuf> {
        self.locator.locate(dependency.binary_name())
    }
}
