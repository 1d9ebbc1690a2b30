//! clipity - paste a video URL, trim it, keep the clip
//!
//! Installs Homebrew, yt-dlp and ffmpeg on first use if they're missing.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clipity::core::dependencies::DependencyChecker;
use clipity::core::downloader::DownloadExecutor;
use clipity::core::installer::Installer;
use clipity::core::metadata::MetadataFetcher;
use clipity::core::process::SystemRunner;
use clipity::error::ClipError;
use clipity::storage::config::{self, resolve_download_dir};
use clipity::storage::history::ClipHistory;
use clipity::types::{
    Config, CoreEvent, Dependency, DownloadRequest, MediaFormat, Progress, StepStatus, Steps,
};
use clipity::ui::prompt;
use clipity::ui::render::{Presenter, print_status, print_video};
use clipity::utils::paths::{ensure_app_dirs, get_config_path, get_history_path};
use colored::Colorize;
use log::debug;

/// Paste a video URL, trim it, keep the clip.
#[derive(Parser, Debug)]
#[command(name = "clipity")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which tools are installed
    Check,

    /// Install every missing tool
    Setup,

    /// Install one tool
    Install {
        #[arg(value_enum)]
        tool: Tool,
    },

    /// Show title, uploader and length of a video
    Info { url: String },

    /// Download a clip
    Clip {
        url: String,

        /// Start time (h:mm:ss, mm:ss or ss)
        #[arg(short, long)]
        start: Option<String>,

        /// End time (h:mm:ss, mm:ss or ss)
        #[arg(short, long)]
        end: Option<String>,

        /// Save audio only (mp3)
        #[arg(long, conflicts_with = "video")]
        audio: bool,

        /// Save video (mp4)
        #[arg(long)]
        video: bool,

        /// Max video height, e.g. 720
        #[arg(short, long)]
        quality: Option<String>,

        /// Pick trim points and format interactively
        #[arg(short, long)]
        interactive: bool,
    },

    /// List recent clips
    History {
        /// Forget all recent clips
        #[arg(long)]
        clear: bool,
    },

    /// Show the configuration file
    Config {
        /// Open it in the configured editor
        #[arg(long)]
        edit: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Tool {
    Brew,
    YtDlp,
    Ffmpeg,
}

impl From<Tool> for Dependency {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Brew => Dependency::PackageManager,
            Tool::YtDlp => Dependency::Downloader,
            Tool::Ffmpeg => Dependency::Transcoder,
        }
    }
}

/// Trim and format choices for one clip
struct ClipOptions {
    start: Option<String>,
    end: Option<String>,
    format: Option<MediaFormat>,
    quality: Option<String>,
    interactive: bool,
}

/// Shared handles for one CLI run
struct App {
    config: Config,
    checker: DependencyChecker,
    runner: SystemRunner,
    presenter: Presenter,
}

impl App {
    fn installer(&self) -> Installer<SystemRunner> {
        Installer::new(self.runner.clone(), self.checker.clone())
    }

    async fn setup(&mut self) -> anyhow::Result<()> {
        let installer = self.installer();
        let mut steps = Steps::default();
        let presenter = &mut self.presenter;
        let status = installer
            .install_all(&mut steps, &mut |dependency: Dependency, status: &StepStatus| {
                presenter.handle(CoreEvent::Step {
                    dependency,
                    status: status.clone(),
                })
            })
            .await?;
        presenter.handle(CoreEvent::Dependencies(status));
        Ok(())
    }

    async fn install(&mut self, dependency: Dependency) -> anyhow::Result<()> {
        let installer = self.installer();
        let mut steps = Steps::default();
        let presenter = &mut self.presenter;
        let status = installer
            .install_single(dependency, &mut steps, &mut |dependency: Dependency, status: &StepStatus| {
                presenter.handle(CoreEvent::Step {
                    dependency,
                    status: status.clone(),
                })
            })
            .await?;
        presenter.handle(CoreEvent::Dependencies(status));
        Ok(())
    }

    /// Offer to install whatever is missing; false if the user declines
    async fn ensure_dependencies(&mut self) -> anyhow::Result<bool> {
        let status = self.checker.check();
        if status.all_present() {
            return Ok(true);
        }

        let missing = status
            .missing()
            .iter()
            .map(|d| d.label())
            .collect::<Vec<_>>()
            .join(", ");
        if !prompt::confirm_install(&missing)? {
            return Ok(false);
        }
        self.setup().await?;
        Ok(true)
    }

    async fn info(&mut self, url: &str) -> anyhow::Result<()> {
        let fetcher = MetadataFetcher::new(self.runner.clone(), self.checker.clone());
        println!("{}", "Fetching video info...".dimmed());
        let video = fetcher.fetch(url).await?;
        print_video(&video);
        Ok(())
    }

    async fn clip(&mut self, url: &str, options: ClipOptions) -> anyhow::Result<()> {
        let fetcher = MetadataFetcher::new(self.runner.clone(), self.checker.clone());
        println!("{}", "Fetching video info...".dimmed());
        let video = fetcher.fetch(url).await?;
        print_video(&video);

        let mut request = DownloadRequest {
            source_url: video.source_url.clone(),
            start_time: options.start,
            end_time: options.end,
            format: options.format.unwrap_or(self.config.format),
            quality_ceiling: options.quality.or_else(|| self.config.quality_ceiling.clone()),
        };
        if options.interactive {
            prompt::ask_clip_options(&mut request, &video)?;
        }
        debug!("download request: {:?}", request);

        let executor = DownloadExecutor::new(
            self.runner.clone(),
            self.checker.clone(),
            resolve_download_dir(&self.config),
        );
        let presenter = &mut self.presenter;
        let path = executor
            .execute(&request, &mut |progress: Progress| {
                presenter.handle(CoreEvent::Progress(progress))
            })
            .await?;
        presenter.handle(CoreEvent::Finished(path.clone()));

        let mut history = ClipHistory::new(get_history_path(), self.config.max_history_entries);
        history.load().await?;
        history.add(&video, &path).await?;
        Ok(())
    }

    /// No subcommand: the full launcher flow
    async fn launch(&mut self) -> anyhow::Result<()> {
        if !self.ensure_dependencies().await? {
            println!("{}", "Nothing to do without yt-dlp and ffmpeg.".yellow());
            return Ok(());
        }
        let url = prompt::ask_url()?;
        self.clip(
            &url,
            ClipOptions {
                start: None,
                end: None,
                format: None,
                quality: None,
                interactive: true,
            },
        )
        .await
    }

    async fn history(&self, clear: bool) -> anyhow::Result<()> {
        let mut history = ClipHistory::new(get_history_path(), self.config.max_history_entries);
        history.load().await?;

        if clear {
            history.clear().await?;
            println!("{}", "Recent clips cleared.".dimmed());
            return Ok(());
        }

        let entries = history.get_all();
        if entries.is_empty() {
            println!("{}", "No clips yet.".yellow());
            return Ok(());
        }
        for entry in entries {
            let when = chrono::DateTime::from_timestamp(entry.timestamp, 0)
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{} {} {}",
                when.dimmed(),
                entry.title,
                entry.path.display().to_string().cyan()
            );
        }
        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli, app: &mut App) -> anyhow::Result<()> {
    match cli.command {
        None => app.launch().await,
        Some(Commands::Check) => {
            print_status(&app.checker.check());
            Ok(())
        }
        Some(Commands::Setup) => app.setup().await,
        Some(Commands::Install { tool }) => app.install(tool.into()).await,
        Some(Commands::Info { url }) => app.info(&url).await,
        Some(Commands::Clip {
            url,
            start,
            end,
            audio,
            video,
            quality,
            interactive,
        }) => {
            let format = if audio {
                Some(MediaFormat::Audio)
            } else if video {
                Some(MediaFormat::Video)
            } else {
                None
            };
            let options = ClipOptions {
                start,
                end,
                format,
                quality,
                interactive,
            };
            app.clip(&url, options).await
        }
        Some(Commands::History { clear }) => app.history(clear).await,
        Some(Commands::Config { edit: true }) => {
            config::edit_config(&app.config.editor).await?;
            Ok(())
        }
        Some(Commands::Config { edit: false }) => {
            println!("{}", get_config_path().display().to_string().dimmed());
            println!("{}", serde_json::to_string_pretty(&app.config)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Ensure app directories exist
    ensure_app_dirs().await?;

    let mut app = App {
        config: config::load_config().await?,
        checker: DependencyChecker::default(),
        runner: SystemRunner::default(),
        presenter: Presenter::new(),
    };

    if let Err(err) = run(cli, &mut app).await {
        match err.downcast_ref::<ClipError>() {
            Some(clip_err) => app.presenter.fail(clip_err),
            None => eprintln!("{} {}", "Error:".red(), err),
        }
        std::process::exit(1);
    }

    Ok(())
}
