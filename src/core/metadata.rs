//! Metadata fetcher - yt-dlp `--dump-json` for a single URL

use crate::core::dependencies::DependencyChecker;
use crate::core::process::{ProcessCommand, ProcessRunner};
use crate::error::{ClipError, Result};
use crate::types::{Dependency, VideoDescriptor};
use log::info;
use serde::Deserialize;

/// The slice of yt-dlp's info JSON we care about
#[derive(Debug, Deserialize)]
struct RawVideoInfo {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
}

/// Reject anything that isn't an http(s) URL before spawning yt-dlp
pub fn validate_url(input: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(input.trim())
        .map_err(|e| ClipError::Validation(format!("Invalid URL '{}': {}", input, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ClipError::Validation(format!(
            "Unsupported URL scheme '{}', expected http or https",
            scheme
        ))),
    }
}

/// Parse yt-dlp's JSON into a descriptor, filling gaps with defaults
pub fn parse_video_info(json: &str, source_url: &str) -> Result<VideoDescriptor> {
    let json = json.trim();
    if json.is_empty() {
        return Err(ClipError::FetchFailure("yt-dlp returned no metadata".into()));
    }

    let raw: RawVideoInfo = serde_json::from_str(json)
        .map_err(|e| ClipError::FetchFailure(format!("unreadable metadata: {}", e)))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".into());

    let duration_seconds = raw
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.round() as u64)
        .unwrap_or(0);

    Ok(VideoDescriptor {
        title,
        duration_seconds,
        thumbnail_url: raw.thumbnail.unwrap_or_default(),
        uploader: raw.uploader.or(raw.channel).unwrap_or_default(),
        source_url: source_url.to_string(),
    })
}

/// Looks up video metadata without downloading
pub struct MetadataFetcher<R> {
    runner: R,
    checker: DependencyChecker,
}

impl<R: ProcessRunner> MetadataFetcher<R> {
    pub fn new(runner: R, checker: DependencyChecker) -> Self {
        Self { runner, checker }
    }

    pub async fn fetch(&self, url: &str) -> Result<VideoDescriptor> {
        let url = validate_url(url)?;
        let downloader = self.checker.check().require(Dependency::Downloader)?;

        info!("fetching metadata for {}", url);
        let command = ProcessCommand::new(downloader).args([
            "--dump-json",
            "--no-playlist",
            url.as_str(),
        ]);

        let output = self.runner.capture(&command).await.map_err(|e| match e {
            ClipError::ProcessFailure { last_line, .. } => ClipError::FetchFailure(
                last_line.unwrap_or_else(|| "yt-dlp exited with an error".into()),
            ),
            other => other,
        })?;

        // One JSON object per line; with --no-playlist there should be exactly one
        let first = output.stdout.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        parse_video_info(first, url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependencies::BinaryLocator;
    use crate::core::testing::{Script, ScriptedRunner};
    use tempfile::TempDir;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn checker_with_downloader(present: bool) -> (TempDir, DependencyChecker) {
        let dir = TempDir::new().unwrap();
        if present {
            std::fs::write(dir.path().join("yt-dlp"), "").unwrap();
        }
        let checker = DependencyChecker::new(BinaryLocator::new(vec![dir.path().to_path_buf()]));
        (dir, checker)
    }

    #[test]
    fn test_parse_full_record() {
        let json = r#"{"title":"Never Gonna Give You Up","duration":212.4,"thumbnail":"https://i.ytimg.com/vi/x/maxres.jpg","uploader":"Rick Astley","channel":"RickAstleyVEVO"}"#;
        let video = parse_video_info(json, URL).unwrap();
        assert_eq!(video.title, "Never Gonna Give You Up");
        assert_eq!(video.duration_seconds, 212);
        assert_eq!(video.thumbnail_url, "https://i.ytimg.com/vi/x/maxres.jpg");
        assert_eq!(video.uploader, "Rick Astley");
        assert_eq!(video.source_url, URL);
    }

    #[test]
    fn test_parse_applies_defaults() {
        let video = parse_video_info(r#"{"title":"  ","channel":"Some Channel"}"#, URL).unwrap();
        assert_eq!(video.title, "Untitled");
        assert_eq!(video.duration_seconds, 0);
        assert_eq!(video.thumbnail_url, "");
        assert_eq!(video.uploader, "Some Channel");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_video_info("", URL), Err(ClipError::FetchFailure(_))));
        assert!(matches!(
            parse_video_info("ERROR: not json", URL),
            Err(ClipError::FetchFailure(_))
        ));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url(URL).is_ok());
        assert!(matches!(validate_url("ftp://host/file"), Err(ClipError::Validation(_))));
        assert!(matches!(validate_url("not a url"), Err(ClipError::Validation(_))));
    }

    #[test]
    fn test_fetch_requires_downloader() {
        let (_dir, checker) = checker_with_downloader(false);
        let fetcher = MetadataFetcher::new(ScriptedRunner::new(|_| Script::default()), checker);

        let err = tokio_test::block_on(fetcher.fetch(URL)).unwrap_err();
        assert!(matches!(
            err,
            ClipError::MissingDependency { dependency: Dependency::Downloader }
        ));
        assert!(fetcher.runner.calls().is_empty());
    }

    #[test]
    fn test_fetch_runs_dump_json() {
        let (dir, checker) = checker_with_downloader(true);
        let runner = ScriptedRunner::new(|_| Script::stdout("{\"title\":\"Clip\",\"duration\":61}\n"));
        let fetcher = MetadataFetcher::new(runner, checker);

        let video = tokio_test::block_on(fetcher.fetch(URL)).unwrap();
        assert_eq!(video.title, "Clip");
        assert_eq!(video.duration_seconds, 61);

        let calls = fetcher.runner.calls();
        assert_eq!(calls[0].program, dir.path().join("yt-dlp"));
        assert_eq!(calls[0].args, vec!["--dump-json", "--no-playlist", URL]);
    }

    #[test]
    fn test_fetch_maps_process_failure() {
        let (_dir, checker) = checker_with_downloader(true);
        let runner = ScriptedRunner::new(|_| Script::failing(&["ERROR: Video unavailable"]));
        let fetcher = MetadataFetcher::new(runner, checker);

        match tokio_test::block_on(fetcher.fetch(URL)) {
            Err(ClipError::FetchFailure(msg)) => assert_eq!(msg, "ERROR: Video unavailable"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
