//! Process runner - spawns external tools and streams their output
//!
//! Every invocation gets its own environment built from a base plus the
//! install directories and non-interactive markers, so no tool ever waits
//! on a terminal prompt.

use crate::core::dependencies::SEARCH_DIRS;
use crate::error::{ClipError, Result};
use crate::utils::text::{MAX_LINE_LEN, display_line, truncate};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Markers that keep brew and its install script from prompting
pub const NON_INTERACTIVE_ENV: [(&str, &str); 4] = [
    ("NONINTERACTIVE", "1"),
    ("CI", "1"),
    ("HOMEBREW_NO_AUTO_UPDATE", "1"),
    ("HOMEBREW_NO_ENV_HINTS", "1"),
];

const READ_CHUNK: usize = 8192;

// ============================================
// Environment
// ============================================

/// Environment handed to every child process
#[derive(Debug, Clone)]
pub struct ProcessEnv {
    base: BTreeMap<String, String>,
    path_prefix: Vec<PathBuf>,
}

impl Default for ProcessEnv {
    fn default() -> Self {
        Self::inherited()
    }
}

impl ProcessEnv {
    pub fn new(base: BTreeMap<String, String>, path_prefix: Vec<PathBuf>) -> Self {
        Self { base, path_prefix }
    }

    /// Current process environment with the standard install directories.
    /// Non-UTF-8 variables are skipped.
    pub fn inherited() -> Self {
        let base = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::new(base, SEARCH_DIRS.iter().map(PathBuf::from).collect())
    }

    /// Full variable set for one invocation
    pub fn build(&self) -> BTreeMap<String, String> {
        let mut env = self.base.clone();

        let mut entries: Vec<String> = self
            .path_prefix
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        if let Some(path) = self.base.get("PATH").filter(|p| !p.is_empty()) {
            entries.push(path.clone());
        }
        env.insert("PATH".into(), entries.join(":"));

        for (key, value) in NON_INTERACTIVE_ENV {
            env.insert(key.into(), value.into());
        }
        env
    }
}

// ============================================
// Commands and outcomes
// ============================================

/// One external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Max characters per forwarded line; `None` forwards whole lines
    pub line_limit: Option<usize>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            line_limit: Some(MAX_LINE_LEN),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Forward untruncated lines (for callers that parse paths out of them)
    pub fn full_lines(mut self) -> Self {
        self.line_limit = None;
        self
    }

    /// Short program name for messages, e.g. "yt-dlp"
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// Result of a streamed run that exited 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub last_line: Option<String>,
}

/// Buffered output of a one-shot run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs.
///
/// `stream` forwards stdout and stderr line by line while the program runs;
/// `capture` waits and hands back everything at once. Both fail with
/// `ProcessFailure` on spawn errors and non-zero exits.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    async fn stream(
        &self,
        command: &ProcessCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutcome>;

    async fn capture(&self, command: &ProcessCommand) -> Result<CapturedOutput>;
}

// ============================================
// Line splitting
// ============================================

/// Reassembles arbitrarily chunked bytes into non-empty lines
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Feed a chunk, returning every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = clean_line(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }
        lines
    }

    /// Flush whatever is left after EOF
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        clean_line(&rest)
    }
}

fn clean_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

struct LineForwarder<'a> {
    limit: Option<usize>,
    on_line: &'a mut dyn FnMut(&str),
    last_line: Option<String>,
}

impl LineForwarder<'_> {
    fn forward(&mut self, lines: impl IntoIterator<Item = String>) {
        for line in lines {
            let line = match self.limit {
                Some(max) => truncate(&line, max),
                None => line,
            };
            debug!("| {}", line);
            (self.on_line)(&line);
            self.last_line = Some(line);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipe {
    Stdout,
    Stderr,
}

enum Chunk {
    Data(Pipe, Vec<u8>),
    Eof(Pipe),
}

/// Reads a pipe to EOF. Once the receiver is gone the bytes are discarded,
/// but the pipe stays open so the child never hits EPIPE.
async fn read_chunks<R>(mut reader: R, pipe: Pipe, tx: mpsc::UnboundedSender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut abandoned = false;
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if !abandoned && tx.send(Chunk::Data(pipe, buf[..n].to_vec())).is_err() {
                    debug!("{:?} receiver dropped, draining until the child exits", pipe);
                    abandoned = true;
                }
            }
            Err(e) => {
                debug!("read from {:?} failed: {}", pipe, e);
                break;
            }
        }
    }
    let _ = tx.send(Chunk::Eof(pipe));
}

// ============================================
// System runner
// ============================================

/// `ProcessRunner` backed by tokio child processes.
///
/// Dropping a pending call does not kill the child; it runs to completion.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    env: ProcessEnv,
}

impl SystemRunner {
    pub fn new(env: ProcessEnv) -> Self {
        Self { env }
    }

    fn command(&self, command: &ProcessCommand) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .env_clear()
            .envs(self.env.build())
            .stdin(Stdio::null());
        cmd
    }
}

fn spawn_failure(command: &ProcessCommand, err: std::io::Error) -> ClipError {
    ClipError::ProcessFailure {
        program: command.program_name(),
        code: None,
        last_line: Some(format!("could not start {}: {}", command.program.display(), err)),
    }
}

fn last_non_empty_line(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(display_line)
}

impl ProcessRunner for SystemRunner {
    async fn stream(
        &self,
        command: &ProcessCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutcome> {
        info!("running {} {}", command.program.display(), command.args.join(" "));

        let mut child = self
            .command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_failure(command, e))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(read_chunks(stdout, Pipe::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_chunks(stderr, Pipe::Stderr, tx.clone()));
        }
        drop(tx);

        // stdout and stderr keep separate buffers so their partial lines never mix
        let mut out_lines = LineSplitter::default();
        let mut err_lines = LineSplitter::default();
        let mut forwarder = LineForwarder {
            limit: command.line_limit,
            on_line,
            last_line: None,
        };

        while let Some(chunk) = rx.recv().await {
            match chunk {
                Chunk::Data(Pipe::Stdout, bytes) => forwarder.forward(out_lines.push(&bytes)),
                Chunk::Data(Pipe::Stderr, bytes) => forwarder.forward(err_lines.push(&bytes)),
                Chunk::Eof(Pipe::Stdout) => forwarder.forward(out_lines.finish()),
                Chunk::Eof(Pipe::Stderr) => forwarder.forward(err_lines.finish()),
            }
        }

        let status = child.wait().await.map_err(|e| spawn_failure(command, e))?;
        let last_line = forwarder.last_line;

        if !status.success() {
            return Err(ClipError::ProcessFailure {
                program: command.program_name(),
                code: status.code(),
                last_line,
            });
        }

        Ok(ProcessOutcome { last_line })
    }

    async fn capture(&self, command: &ProcessCommand) -> Result<CapturedOutput> {
        info!("running {} {}", command.program.display(), command.args.join(" "));

        let output = self
            .command(command)
            .output()
            .await
            .map_err(|e| spawn_failure(command, e))?;

        let captured = CapturedOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(ClipError::ProcessFailure {
                program: command.program_name(),
                code: output.status.code(),
                last_line: last_non_empty_line(&captured.stderr)
                    .or_else(|| last_non_empty_line(&captured.stdout)),
            });
        }

        Ok(captured)
    }
}
