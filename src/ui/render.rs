//! Renders core events to the terminal

use crate::error::ClipError;
use crate::types::{CoreEvent, Dependency, DependencyStatus, Progress, StepStatus, VideoDescriptor};
use crate::utils::time::format_duration;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Turns `CoreEvent`s into terminal output
#[derive(Default)]
pub struct Presenter {
    spinner: Option<ProgressBar>,
    bar: Option<ProgressBar>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: CoreEvent) {
        match event {
            CoreEvent::Dependencies(status) => print_status(&status),
            CoreEvent::Step { dependency, status } => self.step(dependency, &status),
            CoreEvent::Progress(progress) => self.progress(&progress),
            CoreEvent::Finished(path) => self.finished(&path),
            CoreEvent::Failed(message) => {
                self.clear();
                eprintln!("{} {}", "Error:".red(), message);
            }
        }
    }

    /// Report an error, with the manual fix when there is one
    pub fn fail(&mut self, err: &ClipError) {
        self.handle(CoreEvent::Failed(err.user_message()));
        if let Some(remedy) = err.remedy() {
            eprintln!("{} {}", "Run manually:".yellow(), remedy);
        }
    }

    fn step(&mut self, dependency: Dependency, status: &StepStatus) {
        match status {
            StepStatus::Idle => {}
            StepStatus::Running { log } => {
                let spinner = self.spinner.get_or_insert_with(new_spinner);
                spinner.set_message(format!("{}: {}", dependency, log));
            }
            StepStatus::Done { .. } => {
                self.clear();
                println!("{} {} installed", "✓".green(), dependency);
            }
            StepStatus::Error { log } => {
                self.clear();
                eprintln!("{} {}: {}", "✗".red(), dependency, log);
            }
            StepStatus::Skipped => {
                println!("{} {} already installed", "•".dimmed(), dependency);
            }
        }
    }

    fn progress(&mut self, progress: &Progress) {
        let bar = self.bar.get_or_insert_with(new_bar);
        bar.set_position(u64::from(progress.percent));
        bar.set_message(progress.message.clone());
    }

    fn finished(&mut self, path: &Path) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.clear();
        println!("{} Saved to {}", "✓".green(), path.display());
    }

    fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// One line per tool: mark, name, and where it lives or how to get it
pub fn print_status(status: &DependencyStatus) {
    for dependency in Dependency::ALL {
        match status.path(dependency) {
            Some(path) => println!(
                "{} {:<9} {}",
                "✓".green(),
                dependency.label(),
                path.display().to_string().dimmed()
            ),
            None => println!(
                "{} {:<9} {} {}",
                "✗".red(),
                dependency.label(),
                "not installed".yellow(),
                format!("({})", dependency.manual_command()).dimmed()
            ),
        }
    }
}

/// Title, uploader and length of a fetched video
pub fn print_video(video: &VideoDescriptor) {
    println!("{}", video.title.bold());
    if !video.uploader.is_empty() {
        println!("{} {}", "by".dimmed(), video.uploader.cyan());
    }
    println!("{} {}", "Length:".dimmed(), format_duration(video.duration_seconds));
    if !video.thumbnail_url.is_empty() {
        println!("{} {}", "Thumbnail:".dimmed(), video.thumbnail_url);
    }
}
