//! Transcoding stage: extract the audio track with the transcoder

use crate::error::{Error, Result, StageError};
use crate::process::{LineSink, ProcessRunner};
use crate::types::{AcquiredMedia, TranscodedAudio};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs the transcoder and removes the source file afterwards
#[derive(Clone)]
pub struct TranscodingStage {
    runner: Arc<dyn ProcessRunner>,
    ffmpeg: PathBuf,
}

impl TranscodingStage {
    /// Create a stage that invokes the transcoder at `ffmpeg`
    pub fn new(runner: Arc<dyn ProcessRunner>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Convert `input` into an audio-only file at `output`
    ///
    /// Takes ownership of the acquired media. On success the source file is
    /// deleted; if that fails the job still succeeds and the reason is
    /// returned in [`TranscodedAudio::cleanup_warning`] (and published through
    /// `on_progress`).
    ///
    /// # Errors
    ///
    /// - [`Error::OutputExists`] if `output` is already present; the
    ///   transcoder is not started and the source file is kept
    /// - [`StageError::TranscodeFailed`] if the transcoder exits non-zero; the
    ///   source file is kept
    /// - [`crate::Error::Launch`] / [`crate::Error::Cancelled`] from the runner
    pub async fn transcode(
        &self,
        input: AcquiredMedia,
        output: &Path,
        cancel: &CancellationToken,
        on_progress: &mut LineSink<'_>,
    ) -> Result<TranscodedAudio> {
        // the transcoder runs without a terminal and refuses to overwrite
        if tokio::fs::try_exists(output).await? {
            return Err(Error::OutputExists {
                path: output.to_path_buf(),
            });
        }

        let args = [
            OsString::from("-i"),
            input.path().as_os_str().to_owned(),
            OsString::from("-q:a"),
            OsString::from("0"),
            OsString::from("-map"),
            OsString::from("a"),
            output.as_os_str().to_owned(),
        ];

        info!(
            input = %input.path().display(),
            output = %output.display(),
            "starting transcode"
        );

        let outcome = self.runner.run(&self.ffmpeg, &args, cancel, on_progress).await?;

        if !outcome.success() {
            warn!(
                input = %input.path().display(),
                exit_code = ?outcome.exit_code,
                "transcoder failed, keeping source file"
            );
            return Err(StageError::TranscodeFailed {
                exit_code: outcome.exit_code,
                input: input.path,
            }
            .into());
        }

        let cleanup_warning = match tokio::fs::remove_file(input.path()).await {
            Ok(()) => None,
            Err(e) => {
                let message = format!(
                    "could not delete source file {}: {e}",
                    input.path().display()
                );
                warn!(input = %input.path().display(), error = %e, "failed to delete source file");
                on_progress(&message);
                Some(message)
            }
        };

        info!(output = %output.display(), "transcode complete");
        Ok(TranscodedAudio {
            path: output.to_path_buf(),
            cleanup_warning,
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::scripted::{ScriptedRunner, ScriptedStep};
    use tempfile::TempDir;

    #[tokio::test]
    async fn success_deletes_source_and_returns_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("Artist-Song.webm");
        let output = dir.path().join("Artist-Song.mp3");
        std::fs::write(&input, b"media").unwrap();

        let runner = Arc::new(ScriptedRunner::new([ScriptedStep::exits(0)
            .stderr("size=    3072kB time=00:03:20.00 bitrate= 125.8kbits/s")
            .creates(&output)]));
        let stage = TranscodingStage::new(runner.clone(), "/usr/bin/ffmpeg");
        let mut progress = Vec::new();

        let audio = stage
            .transcode(
                AcquiredMedia::new(&input),
                &output,
                &CancellationToken::new(),
                &mut |line: &str| progress.push(line.to_string()),
            )
            .await
            .unwrap();

        assert_eq!(audio.path, output);
        assert!(audio.cleanup_warning.is_none());
        assert!(!input.exists());
        assert!(output.exists());
        assert_eq!(progress.len(), 1);

        let calls = runner.calls();
        assert_eq!(
            calls[0].args,
            vec![
                "-i".to_string(),
                input.to_string_lossy().into_owned(),
                "-q:a".to_string(),
                "0".to_string(),
                "-map".to_string(),
                "a".to_string(),
                output.to_string_lossy().into_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn failure_keeps_source_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("Artist-Song.webm");
        std::fs::write(&input, b"media").unwrap();

        let runner = Arc::new(ScriptedRunner::new([
            ScriptedStep::exits(1).stderr("Invalid data found when processing input")
        ]));
        let stage = TranscodingStage::new(runner, "ffmpeg");

        let err = stage
            .transcode(
                AcquiredMedia::new(&input),
                &dir.path().join("Artist-Song.mp3"),
                &CancellationToken::new(),
                &mut |_: &str| {},
            )
            .await
            .unwrap_err();

        match err {
            Error::Stage(StageError::TranscodeFailed {
                exit_code,
                input: kept,
            }) => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(kept, input);
            }
            other => panic!("expected TranscodeFailed, got {other:?}"),
        }
        assert!(input.exists());
    }

    #[tokio::test]
    async fn existing_output_is_refused_before_running() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("Artist-Song.webm");
        let output = dir.path().join("Artist-Song.mp3");
        std::fs::write(&input, b"media").unwrap();
        std::fs::write(&output, b"earlier audio").unwrap();

        let runner = Arc::new(ScriptedRunner::default());
        let stage = TranscodingStage::new(runner.clone(), "ffmpeg");

        let err = stage
            .transcode(
                AcquiredMedia::new(&input),
                &output,
                &CancellationToken::new(),
                &mut |_: &str| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::OutputExists { ref path } if *path == output));
        assert!(runner.calls().is_empty());
        assert!(input.exists());
        assert_eq!(std::fs::read(&output).unwrap(), b"earlier audio");
    }

    #[tokio::test]
    async fn deletion_failure_is_a_warning() {
        let dir = TempDir::new().unwrap();
        // never created, so removal fails
        let input = dir.path().join("already-gone.webm");
        let output = dir.path().join("already-gone.mp3");

        let runner = Arc::new(ScriptedRunner::new([ScriptedStep::exits(0).creates(&output)]));
        let stage = TranscodingStage::new(runner, "ffmpeg");
        let mut progress = Vec::new();

        let audio = stage
            .transcode(
                AcquiredMedia::new(&input),
                &output,
                &CancellationToken::new(),
                &mut |line: &str| progress.push(line.to_string()),
            )
            .await
            .unwrap();

        let warning = audio.cleanup_warning.expect("cleanup warning");
        assert!(warning.contains("already-gone.webm"));
        assert_eq!(progress, vec![warning]);
    }

    #[tokio::test]
    async fn cancelled_job_keeps_source_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("Artist-Song.webm");
        std::fs::write(&input, b"media").unwrap();

        let runner = Arc::new(ScriptedRunner::new([ScriptedStep::exits(0)]));
        let stage = TranscodingStage::new(runner, "ffmpeg");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = stage
            .transcode(
                AcquiredMedia::new(&input),
                &dir.path().join("Artist-Song.mp3"),
                &cancel,
                &mut |_: &str| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(input.exists());
    }
}
