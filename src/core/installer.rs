//! Installer - brings Homebrew, yt-dlp and ffmpeg onto the machine
//!
//! Steps run strictly one after another: the packages need brew, and brew
//! holds its own lock that concurrent installs would fight over.

use crate::core::dependencies::DependencyChecker;
use crate::core::process::{ProcessCommand, ProcessRunner};
use crate::error::{ClipError, Result};
use crate::types::{Dependency, DependencyStatus, StepStatus, Steps};
use crate::utils::text::display_line;
use log::{error, info};

const BOOTSTRAP_SHELL: &str = "/bin/bash";

/// Drives installs through a `ProcessRunner`
pub struct Installer<R> {
    runner: R,
    checker: DependencyChecker,
}

impl<R: ProcessRunner> Installer<R> {
    pub fn new(runner: R, checker: DependencyChecker) -> Self {
        Self { runner, checker }
    }

    /// Run the official Homebrew bootstrap script
    pub async fn install_package_manager(&self, on_line: &mut dyn FnMut(&str)) -> Result<()> {
        let command = ProcessCommand::new(BOOTSTRAP_SHELL)
            .args(["-c", Dependency::PackageManager.manual_command()]);
        self.runner.stream(&command, on_line).await?;
        Ok(())
    }

    /// `brew install <package>` for the downloader or transcoder
    pub async fn install_package(
        &self,
        dependency: Dependency,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<()> {
        let brew = self.checker.check().require(Dependency::PackageManager)?;
        let command = ProcessCommand::new(brew).args(["install", dependency.package_name()]);
        self.runner.stream(&command, on_line).await?;
        Ok(())
    }

    /// Install everything that is missing, in order.
    ///
    /// Stops at the first failing step; later steps stay idle. Returns a fresh
    /// status once every step is done or skipped.
    pub async fn install_all(
        &self,
        steps: &mut Steps,
        on_update: &mut dyn FnMut(Dependency, &StepStatus),
    ) -> Result<DependencyStatus> {
        steps.reset();
        let status = self.checker.check();

        for dependency in Dependency::ALL {
            if status.is_present(dependency) {
                steps.set(dependency, StepStatus::Skipped);
                on_update(dependency, steps.get(dependency));
                continue;
            }
            self.run_step(dependency, steps, on_update).await?;
        }

        let refreshed = self.checker.check();
        info!("install finished, all present: {}", refreshed.all_present());
        Ok(refreshed)
    }

    /// Install one tool outside the full sequence
    pub async fn install_single(
        &self,
        dependency: Dependency,
        steps: &mut Steps,
        on_update: &mut dyn FnMut(Dependency, &StepStatus),
    ) -> Result<DependencyStatus> {
        if self.checker.check().is_present(dependency) {
            steps.set(dependency, StepStatus::Skipped);
            on_update(dependency, steps.get(dependency));
        } else {
            self.run_step(dependency, steps, on_update).await?;
        }
        Ok(self.checker.check())
    }

    async fn run_step(
        &self,
        dependency: Dependency,
        steps: &mut Steps,
        on_update: &mut dyn FnMut(Dependency, &StepStatus),
    ) -> Result<()> {
        info!("installing {}", dependency);
        steps.set(
            dependency,
            StepStatus::Running {
                log: format!("Installing {}...", dependency),
            },
        );
        on_update(dependency, steps.get(dependency));

        let result = {
            let mut on_line = |line: &str| {
                steps.set(dependency, StepStatus::Running { log: display_line(line) });
                on_update(dependency, steps.get(dependency));
            };
            match dependency {
                Dependency::PackageManager => self.install_package_manager(&mut on_line).await,
                Dependency::Downloader | Dependency::Transcoder => {
                    self.install_package(dependency, &mut on_line).await
                }
            }
        };

        match result {
            Ok(()) => {
                let log = steps
                    .get(dependency)
                    .log()
                    .map(String::from)
                    .unwrap_or_default();
                steps.set(dependency, StepStatus::Done { log });
                on_update(dependency, steps.get(dependency));
                Ok(())
            }
            Err(e) => {
                error!("{} install failed: {}", dependency, e);
                steps.set(dependency, StepStatus::Error { log: display_line(&e.to_string()) });
                on_update(dependency, steps.get(dependency));
                Err(ClipError::InstallFailed {
                    dependency,
                    reason: e.to_string(),
                })
            }
        }
    }
}
