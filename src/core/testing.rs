//! Scripted `ProcessRunner` for tests

use crate::core::process::{CapturedOutput, ProcessCommand, ProcessOutcome, ProcessRunner};
use crate::error::{ClipError, Result};
use crate::utils::text::truncate;
use std::path::PathBuf;
use std::sync::Mutex;

/// What a scripted invocation does
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub lines: Vec<String>,
    pub stdout: String,
    pub fails: bool,
    /// File to create, standing in for an install putting a binary on disk
    pub creates: Option<PathBuf>,
}

impl Script {
    pub fn ok(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing(lines: &[&str]) -> Self {
        Self {
            fails: true,
            ..Self::ok(lines)
        }
    }

    pub fn stdout(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            ..Default::default()
        }
    }

    pub fn creating(mut self, path: PathBuf) -> Self {
        self.creates = Some(path);
        self
    }
}

type Handler = Box<dyn Fn(&ProcessCommand) -> Script + Send + Sync>;

pub struct ScriptedRunner {
    handler: Handler,
    calls: Mutex<Vec<ProcessCommand>>,
}

impl ScriptedRunner {
    pub fn new(handler: impl Fn(&ProcessCommand) -> Script + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProcessCommand> {
        self.calls.lock().unwrap().clone()
    }

    fn play(&self, command: &ProcessCommand) -> Script {
        self.calls.lock().unwrap().push(command.clone());
        let script = (self.handler)(command);
        if let Some(path) = &script.creates {
            std::fs::write(path, "").unwrap();
        }
        script
    }

    fn failure(command: &ProcessCommand, last_line: Option<String>) -> ClipError {
        ClipError::ProcessFailure {
            program: command.program_name(),
            code: Some(1),
            last_line,
        }
    }
}

impl ProcessRunner for ScriptedRunner {
    async fn stream(
        &self,
        command: &ProcessCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutcome> {
        let script = self.play(command);
        let mut last_line = None;
        for line in &script.lines {
            let line = match command.line_limit {
                Some(max) => truncate(line, max),
                None => line.clone(),
            };
            on_line(&line);
            last_line = Some(line);
        }
        if script.fails {
            return Err(Self::failure(command, last_line));
        }
        Ok(ProcessOutcome { last_line })
    }

    async fn capture(&self, command: &ProcessCommand) -> Result<CapturedOutput> {
        let script = self.play(command);
        if script.fails {
            return Err(Self::failure(command, script.lines.last().cloned()));
        }
        Ok(CapturedOutput {
            stdout: script.stdout,
            stderr: script.lines.join("\n"),
        })
    }
}
