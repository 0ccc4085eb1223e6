//! Trait for launching external executables

use crate::types::ProcessOutcome;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Callback receiving each output line of a running process
///
/// Lines are only borrowed for the duration of the call.
pub type LineSink<'s> = dyn for<'a> FnMut(&'a str) + Send + 's;

/// Trait for running an external executable while streaming its output
///
/// Implementations must forward every output line, from either stream, to
/// `on_line` as soon as it is available and before the process exits. The
/// caller only suspends on line availability and on process exit.
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
/// let mut lines = Vec::new();
/// let outcome = runner
///     .run(
///         Path::new("yt-dlp"),
///         &[OsString::from("--version")],
///         &CancellationToken::new(),
///         &mut |line: &str| lines.push(line.to_string()),
///     )
///     .await?;
/// assert!(outcome.success());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` to completion
    ///
    /// # Returns
    ///
    /// A [`ProcessOutcome`] with the exit code and every captured line. A
    /// non-zero exit code is not an error at this layer; the calling stage
    /// decides what it means.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The executable cannot be launched (`Error::Launch`)
    /// - `cancel` fires before the process exits (`Error::Cancelled`); the
    ///   child is killed first
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        cancel: &CancellationToken,
        on_line: &mut LineSink<'_>,
    ) -> crate::Result<ProcessOutcome>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
