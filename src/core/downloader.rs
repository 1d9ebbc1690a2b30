//! Downloader module - runs yt-dlp for one clip

use crate::core::classifier::{OutputClassifier, YtDlpClassifier};
use crate::core::dependencies::DependencyChecker;
use crate::core::metadata::validate_url;
use crate::core::process::{ProcessCommand, ProcessRunner};
use crate::error::{ClipError, Result};
use crate::types::{Dependency, DownloadRequest, MediaFormat, Progress, TrimRange};
use crate::utils::text::display_line;
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Output name template, relative to the output directory
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Build yt-dlp arguments for a validated request
pub fn build_download_args(
    request: &DownloadRequest,
    range: &TrimRange,
    output_dir: &Path,
    ffmpeg: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["--no-playlist".into(), "--newline".into()];

    args.push("-o".into());
    args.push(output_dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned());
    args.push("--ffmpeg-location".into());
    args.push(ffmpeg.to_string_lossy().into_owned());

    match request.format {
        MediaFormat::Audio => {
            args.extend(["-x", "--audio-format", "mp3", "--audio-quality", "0"].map(String::from));
        }
        MediaFormat::Video => {
            let height = request.quality_ceiling.as_deref().and_then(parse_height);
            args.push("-f".into());
            args.push(video_format_selector(height));
            args.extend(["--merge-output-format", "mp4", "--remux-video", "mp4"].map(String::from));
        }
    }

    if let Some(section) = range.section_spec() {
        args.push("--download-sections".into());
        args.push(section);
        args.push("--force-keyframes-at-cuts".into());
    }

    args.push(request.source_url.trim().to_string());
    args
}

/// "1080", "1080p" and "1080P" all mean a 1080-pixel ceiling
fn parse_height(ceiling: &str) -> Option<u32> {
    let digits = ceiling.trim().trim_end_matches(['p', 'P']);
    match digits.parse::<u32>() {
        Ok(height) if height > 0 => Some(height),
        _ => {
            warn!("ignoring quality ceiling '{}'", ceiling);
            None
        }
    }
}

/// Best mp4 video + m4a audio under the ceiling, falling back to whatever exists
fn video_format_selector(height: Option<u32>) -> String {
    let cap = height.map(|h| format!("[height<={}]", h)).unwrap_or_default();
    format!("bv*{cap}[ext=mp4]+ba[ext=m4a]/b{cap}[ext=mp4]/bv*+ba/b")
}

/// Runs clip downloads
pub struct DownloadExecutor<R, C = YtDlpClassifier> {
    runner: R,
    checker: DependencyChecker,
    classifier: C,
    output_dir: PathBuf,
}

impl<R: ProcessRunner> DownloadExecutor<R> {
    pub fn new(runner: R, checker: DependencyChecker, output_dir: PathBuf) -> Self {
        Self::with_classifier(runner, checker, YtDlpClassifier::default(), output_dir)
    }
}

impl<R: ProcessRunner, C: OutputClassifier> DownloadExecutor<R, C> {
    pub fn with_classifier(
        runner: R,
        checker: DependencyChecker,
        classifier: C,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            runner,
            checker,
            classifier,
            output_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download a clip and return the file yt-dlp reported writing.
    ///
    /// If yt-dlp never names a file, the output directory is returned instead.
    pub async fn execute(
        &self,
        request: &DownloadRequest,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<PathBuf> {
        validate_url(&request.source_url)?;
        let range = request.trim_range()?;

        let status = self.checker.check();
        let downloader = status.require(Dependency::Downloader)?;
        let transcoder = status.require(Dependency::Transcoder)?;

        fs::create_dir_all(&self.output_dir).await?;

        let args = build_download_args(request, &range, &self.output_dir, &transcoder);
        let command = ProcessCommand::new(downloader).args(args).full_lines();
        info!("downloading {} ({:?})", request.source_url, request.format);

        let mut artifact: Option<PathBuf> = None;
        let mut on_line = |line: &str| {
            if let Some(percent) = self.classifier.extract_progress(line) {
                on_progress(Progress {
                    percent,
                    message: display_line(line),
                });
            }
            if let Some(path) = self.classifier.extract_artifact_path(line) {
                artifact = Some(path);
            }
        };

        self.runner
            .stream(&command, &mut on_line)
            .await
            .map_err(|e| match e {
                ClipError::ProcessFailure { last_line, code, .. } => ClipError::DownloadFailure(
                    last_line.unwrap_or_else(|| format!("yt-dlp exited with code {:?}", code)),
                ),
                other => other,
            })?;

        match artifact {
            Some(path) => {
                info!("saved {}", path.display());
                Ok(path)
            }
            None => {
                warn!("yt-dlp never reported an output file, returning the output directory");
                Ok(self.output_dir.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependencies::BinaryLocator;
    use crate::core::testing::{Script, ScriptedRunner};
    use tempfile::TempDir;

    const URL: &str = "https://www.youtube.com/watch?v=abc123";

    struct Fixture {
        bin: TempDir,
        out: TempDir,
    }

    impl Fixture {
        fn new(present: &[Dependency]) -> Self {
            let bin = TempDir::new().unwrap();
            for dependency in present {
                std::fs::write(bin.path().join(dependency.binary_name()), "").unwrap();
            }
            Self {
                bin,
                out: TempDir::new().unwrap(),
            }
        }

        fn executor(&self, script: Script) -> DownloadExecutor<ScriptedRunner> {
            let checker = DependencyChecker::new(BinaryLocator::new(vec![self.bin.path().to_path_buf()]));
            let runner = ScriptedRunner::new(move |_| script.clone());
            DownloadExecutor::new(runner, checker, self.out.path().join("clipity"))
        }
    }

    fn video_request() -> DownloadRequest {
        DownloadRequest::new(URL, MediaFormat::Video)
    }

    fn run(
        executor: &DownloadExecutor<ScriptedRunner>,
        request: &DownloadRequest,
    ) -> (Result<PathBuf>, Vec<u8>) {
        let mut seen = Vec::new();
        let result = tokio_test::block_on(
            executor.execute(request, &mut |p: Progress| seen.push(p.percent)),
        );
        (result, seen)
    }

    #[test]
    fn test_audio_args() {
        let request = DownloadRequest::new(URL, MediaFormat::Audio);
        let args = build_download_args(
            &request,
            &TrimRange::default(),
            Path::new("/out"),
            Path::new("/opt/homebrew/bin/ffmpeg"),
        );
        assert_eq!(
            args,
            vec![
                "--no-playlist",
                "--newline",
                "-o",
                "/out/%(title)s.%(ext)s",
                "--ffmpeg-location",
                "/opt/homebrew/bin/ffmpeg",
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
                URL,
            ]
        );
    }

    #[test]
    fn test_video_args_with_ceiling_and_trim() {
        let request = DownloadRequest {
            quality_ceiling: Some("720p".into()),
            ..video_request()
        };
        let range = TrimRange { start: Some(5), end: Some(10) };
        let args = build_download_args(&request, &range, Path::new("/out"), Path::new("/ff"));

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(
            args[f + 1],
            "bv*[height<=720][ext=mp4]+ba[ext=m4a]/b[height<=720][ext=mp4]/bv*+ba/b"
        );
        assert!(args.contains(&"--merge-output-format".to_string()));

        let s = args.iter().position(|a| a == "--download-sections").unwrap();
        assert_eq!(args[s + 1], "*5-10");
        assert_eq!(args[s + 2], "--force-keyframes-at-cuts");
        assert_eq!(args.last().unwrap(), URL);
    }

    #[test]
    fn test_video_args_without_ceiling() {
        let request = DownloadRequest {
            quality_ceiling: Some("best".into()),
            ..video_request()
        };
        let args = build_download_args(&request, &TrimRange::default(), Path::new("/o"), Path::new("/ff"));
        assert!(args.contains(&"bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]/bv*+ba/b".to_string()));
        assert!(!args.contains(&"--download-sections".to_string()));
    }

    #[test]
    fn test_invalid_range_rejected_before_spawn() {
        let fixture = Fixture::new(&Dependency::ALL);
        let executor = fixture.executor(Script::ok(&[]));
        let request = DownloadRequest {
            start_time: Some("00:10".into()),
            end_time: Some("00:05".into()),
            ..video_request()
        };

        let (result, _) = run(&executor, &request);
        assert!(matches!(result, Err(ClipError::Validation(_))));
        assert!(executor.runner.calls().is_empty());
    }

    #[test]
    fn test_valid_range_is_passed_through() {
        let fixture = Fixture::new(&Dependency::ALL);
        let executor = fixture.executor(Script::ok(&[]));
        let request = DownloadRequest {
            start_time: Some("00:05".into()),
            end_time: Some("00:10".into()),
            ..video_request()
        };

        let (result, _) = run(&executor, &request);
        assert!(result.is_ok());
        let calls = executor.runner.calls();
        assert!(calls[0].args.contains(&"*5-10".to_string()));
        assert_eq!(calls[0].line_limit, None);
    }

    #[test]
    fn test_missing_transcoder_is_reported() {
        let fixture = Fixture::new(&[Dependency::PackageManager, Dependency::Downloader]);
        let executor = fixture.executor(Script::ok(&[]));

        let (result, _) = run(&executor, &video_request());
        assert!(matches!(
            result,
            Err(ClipError::MissingDependency { dependency: Dependency::Transcoder })
        ));
        assert!(executor.runner.calls().is_empty());
    }

    #[test]
    fn test_missing_downloader_is_reported() {
        let fixture = Fixture::new(&[Dependency::PackageManager, Dependency::Transcoder]);
        let executor = fixture.executor(Script::ok(&[]));

        let (result, _) = run(&executor, &video_request());
        assert!(matches!(
            result,
            Err(ClipError::MissingDependency { dependency: Dependency::Downloader })
        ));
        assert!(executor.runner.calls().is_empty());
    }

    /// Understands a made-up "PCT <n>" / "FILE <path>" output format
    struct PlainClassifier;

    impl OutputClassifier for PlainClassifier {
        fn extract_progress(&self, line: &str) -> Option<u8> {
            line.strip_prefix("PCT ")?.parse().ok()
        }

        fn extract_artifact_path(&self, line: &str) -> Option<PathBuf> {
            line.strip_prefix("FILE ").map(PathBuf::from)
        }
    }

    #[test]
    fn test_custom_classifier_drives_progress_and_path() {
        let fixture = Fixture::new(&Dependency::ALL);
        let checker = DependencyChecker::new(BinaryLocator::new(vec![fixture.bin.path().to_path_buf()]));
        let script = Script::ok(&[
            "PCT 10",
            "[download]  55.0% of 1.00MiB",
            "[download] Destination: /ignored/by/this/classifier.mp4",
            "PCT 90",
            "FILE /clips/custom.mp4",
        ]);
        let executor = DownloadExecutor::with_classifier(
            ScriptedRunner::new(move |_| script.clone()),
            checker,
            PlainClassifier,
            fixture.out.path().to_path_buf(),
        );

        let mut seen = Vec::new();
        let result = tokio_test::block_on(
            executor.execute(&video_request(), &mut |p: Progress| seen.push(p.percent)),
        );
        assert_eq!(result.unwrap(), PathBuf::from("/clips/custom.mp4"));
        assert_eq!(seen, vec![10, 90]);
    }

    #[test]
    fn test_percent_in_title_does_not_rewind_progress() {
        let fixture = Fixture::new(&Dependency::ALL);
        let executor = fixture.executor(Script::ok(&[
            "[download] Destination: /dl/clipity/50% Off.f137.mp4",
            "[download] 100% of 10.00MiB in 00:05",
            "[Merger] Merging formats into \"/dl/clipity/50% Off.mp4\"",
        ]));

        let (result, seen) = run(&executor, &video_request());
        assert_eq!(result.unwrap(), PathBuf::from("/dl/clipity/50% Off.mp4"));
        assert_eq!(seen, vec![100]);
    }

    #[test]
    fn test_progress_and_last_path_win() {
        let fixture = Fixture::new(&Dependency::ALL);
        let executor = fixture.executor(Script::ok(&[
            "[youtube] abc123: Downloading webpage",
            "[download] Destination: /dl/clipity/Title.f137.mp4",
            "[download]  42.5% of 10.00MiB at 2.00MiB/s ETA 00:03",
            "[download] 100% of 10.00MiB in 00:05",
            "[download] Destination: /dl/clipity/Title.f140.m4a",
            "[Merger] Merging formats into \"/dl/clipity/Title.mp4\"",
            "Deleting original file /dl/clipity/Title.f137.mp4 (pass -k to keep)",
        ]));

        let (result, seen) = run(&executor, &video_request());
        assert_eq!(result.unwrap(), PathBuf::from("/dl/clipity/Title.mp4"));
        assert_eq!(seen, vec![43, 100]);
    }

    #[test]
    fn test_no_path_falls_back_to_output_dir() {
        let fixture = Fixture::new(&Dependency::ALL);
        let executor = fixture.executor(Script::ok(&["[download] 100% of 1.00MiB"]));

        let (result, _) = run(&executor, &video_request());
        let path = result.unwrap();
        assert_eq!(path, fixture.out.path().join("clipity"));
        assert_eq!(path, executor.output_dir());
        assert!(path.is_dir());
    }

    #[test]
    fn test_process_failure_becomes_download_failure() {
        let fixture = Fixture::new(&Dependency::ALL);
        let executor = fixture.executor(Script::failing(&[
            "[download]   3.0% of 10.00MiB",
            "ERROR: unable to download video data: HTTP Error 403: Forbidden",
        ]));

        let (result, seen) = run(&executor, &video_request());
        match result {
            Err(ClipError::DownloadFailure(msg)) => assert!(msg.contains("HTTP Error 403")),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(seen, vec![3]);
    }
}
