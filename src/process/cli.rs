//! Process runner backed by `tokio::process`

use super::lines::LineSplitter;
use super::traits::{LineSink, ProcessRunner};
use crate::error::Error;
use crate::types::ProcessOutcome;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Runs executables directly (no shell) with piped output
///
/// stdin is closed, stdout and stderr are read concurrently, and every line is
/// forwarded to the caller's callback as soon as it is read. The child is
/// killed if the returned future is dropped, so wrapping a call in
/// `tokio::time::timeout` never leaks a process.
///
/// # Examples
///
/// ```no_run
/// use audio_fetch::process::{CliProcessRunner, ProcessRunner};
/// use std::ffi::OsString;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let runner = CliProcessRunner::new();
/// let outcome = runner
///     .run(
///         Path::new("/usr/bin/yt-dlp"),
///         &[OsString::from("--version")],
///         &CancellationToken::new(),
///         &mut |line: &str| println!("yt-dlp: {line}"),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CliProcessRunner;

impl CliProcessRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for CliProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        cancel: &CancellationToken,
        on_line: &mut LineSink<'_>,
    ) -> crate::Result<ProcessOutcome> {
        let launch_error = |reason: String| Error::Launch {
            program: program.to_path_buf(),
            reason,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| launch_error(e.to_string()))?;

        tracing::debug!(
            program = %program.display(),
            pid = ?child.id(),
            "process started"
        );

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| launch_error("stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| launch_error("stderr was not captured".to_string()))?;

        let mut outcome = ProcessOutcome::default();
        let mut stdout_splitter = LineSplitter::default();
        let mut stderr_splitter = LineSplitter::default();
        let mut stdout_buf = vec![0u8; READ_BUFFER_SIZE];
        let mut stderr_buf = vec![0u8; READ_BUFFER_SIZE];
        let mut stdout_open = true;
        let mut stderr_open = true;

        while stdout_open || stderr_open {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(terminate(&mut child, program).await);
                }
                read = stdout.read(&mut stdout_buf), if stdout_open => match read {
                    Ok(0) => stdout_open = false,
                    Ok(n) => stdout_splitter.feed(&stdout_buf[..n], |line| {
                        on_line(&line);
                        outcome.stdout_lines.push(line);
                    }),
                    Err(e) => {
                        tracing::warn!(program = %program.display(), error = %e, "failed to read stdout");
                        stdout_open = false;
                    }
                },
                read = stderr.read(&mut stderr_buf), if stderr_open => match read {
                    Ok(0) => stderr_open = false,
                    Ok(n) => stderr_splitter.feed(&stderr_buf[..n], |line| {
                        on_line(&line);
                        outcome.stderr_lines.push(line);
                    }),
                    Err(e) => {
                        tracing::warn!(program = %program.display(), error = %e, "failed to read stderr");
                        stderr_open = false;
                    }
                },
            }
        }

        if let Some(line) = stdout_splitter.finish() {
            on_line(&line);
            outcome.stdout_lines.push(line);
        }
        if let Some(line) = stderr_splitter.finish() {
            on_line(&line);
            outcome.stderr_lines.push(line);
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(terminate(&mut child, program).await);
            }
            status = child.wait() => status?,
        };

        outcome.exit_code = status.code();
        tracing::debug!(
            program = %program.display(),
            exit_code = ?outcome.exit_code,
            stdout_lines = outcome.stdout_lines.len(),
            stderr_lines = outcome.stderr_lines.len(),
            "process exited"
        );

        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "cli"
    }
}

async fn terminate(child: &mut Child, program: &Path) -> Error {
    tracing::info!(program = %program.display(), pid = ?child.id(), "cancelling process");
    if let Err(e) = child.kill().await {
        tracing::warn!(program = %program.display(), error = %e, "failed to kill process");
    }
    Error::Cancelled
}
