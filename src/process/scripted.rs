//! In-memory process runner for tests
//!
//! Replays a queue of scripted invocations instead of launching executables,
//! recording every call so tests can assert on the exact command lines.

use super::traits::{LineSink, ProcessRunner};
use crate::error::Error;
use crate::types::ProcessOutcome;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One scripted process run
#[derive(Debug, Default, Clone)]
pub(crate) struct ScriptedStep {
    stdout: Vec<String>,
    stderr: Vec<String>,
    exit_code: Option<i32>,
    creates: Vec<PathBuf>,
    launch_failure: bool,
}

impl ScriptedStep {
    /// A run that exits with `code`
    pub(crate) fn exits(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Default::default()
        }
    }

    /// A run whose executable cannot be started
    pub(crate) fn fails_to_launch() -> Self {
        Self {
            launch_failure: true,
            ..Default::default()
        }
    }

    pub(crate) fn stdout(mut self, line: &str) -> Self {
        self.stdout.push(line.to_string());
        self
    }

    pub(crate) fn stderr(mut self, line: &str) -> Self {
        self.stderr.push(line.to_string());
        self
    }

    /// Write a small file at `path` while "running"
    pub(crate) fn creates(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates.push(path.into());
        self
    }
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<String>,
}

#[derive(Default)]
pub(crate) struct ScriptedRunner {
    steps: Mutex<VecDeque<ScriptedStep>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub(crate) fn new(steps: impl IntoIterator<Item = ScriptedStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        cancel: &CancellationToken,
        on_line: &mut LineSink<'_>,
    ) -> crate::Result<ProcessOutcome> {
        self.calls.lock().unwrap().push(Invocation {
            program: program.to_path_buf(),
            args: args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
        });

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Launch {
                program: program.to_path_buf(),
                reason: "no scripted step left".to_string(),
            })?;

        if step.launch_failure {
            return Err(Error::Launch {
                program: program.to_path_buf(),
                reason: "No such file or directory (os error 2)".to_string(),
            });
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        for line in step.stdout.iter().chain(step.stderr.iter()) {
            on_line(line);
        }
        for path in &step.creates {
            std::fs::write(path, b"media").unwrap();
        }

        Ok(ProcessOutcome {
            exit_code: step.exit_code,
            stdout_lines: step.stdout,
            stderr_lines: step.stderr,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
