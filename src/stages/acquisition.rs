//! Acquisition stage: fetch remote media with the downloader

use crate::error::{Result, StageError};
use crate::process::{LineSink, ProcessRunner};
use crate::types::{AcquiredMedia, NamingPair};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Progress text published before the downloader is launched
pub const START_MESSAGE: &str = "Starting download...";

/// Extension the downloader appends when it keeps the source container
pub const FALLBACK_EXTENSION: &str = "webm";

/// Runs the downloader in fetch mode
#[derive(Clone)]
pub struct AcquisitionStage {
    runner: Arc<dyn ProcessRunner>,
    ytdlp: PathBuf,
    download_dir: PathBuf,
}

impl AcquisitionStage {
    /// Create a stage writing into `download_dir`
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        ytdlp: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            ytdlp: ytdlp.into(),
            download_dir: download_dir.into(),
        }
    }

    /// Download `url` to `{download_dir}/{artist}-{title}`
    ///
    /// Publishes [`START_MESSAGE`] and then every downloader output line through
    /// `on_progress`. Nothing is cleaned up on failure.
    ///
    /// # Returns
    ///
    /// The destination path if the downloader wrote it as-is, otherwise the
    /// same path with a `.webm` extension appended.
    ///
    /// # Errors
    ///
    /// - [`StageError::DownloadFailed`] if the downloader exits non-zero
    /// - [`StageError::DownloadOutputMissing`] if neither candidate file exists
    /// - [`crate::Error::Launch`] / [`crate::Error::Cancelled`] from the runner
    pub async fn acquire(
        &self,
        url: &str,
        naming: &NamingPair,
        cancel: &CancellationToken,
        on_progress: &mut LineSink<'_>,
    ) -> Result<AcquiredMedia> {
        let base = self.download_dir.join(naming.file_stem());
        let args = [
            OsString::from("-o"),
            output_template(&base),
            OsString::from(url),
        ];

        on_progress(START_MESSAGE);
        info!(url = %url, destination = %base.display(), "starting download");

        let outcome = self.runner.run(&self.ytdlp, &args, cancel, on_progress).await?;

        if !outcome.success() {
            warn!(url = %url, exit_code = ?outcome.exit_code, "downloader failed");
            return Err(StageError::DownloadFailed {
                exit_code: outcome.exit_code,
            }
            .into());
        }

        let path = resolve_output(&base).await?;
        info!(url = %url, path = %path.display(), "download complete");
        Ok(AcquiredMedia::new(path))
    }
}

/// The downloader reads `-o` as an output template, so literal `%` is doubled
///
/// Non-UTF-8 paths are passed through unchanged.
fn output_template(base: &Path) -> OsString {
    match base.to_str() {
        Some(path) => OsString::from(path.replace('%', "%%")),
        None => base.as_os_str().to_owned(),
    }
}

async fn resolve_output(base: &Path) -> Result<PathBuf> {
    if tokio::fs::try_exists(base).await? {
        return Ok(base.to_path_buf());
    }

    let mut fallback = base.as_os_str().to_owned();
    fallback.push(".");
    fallback.push(FALLBACK_EXTENSION);
    let fallback = PathBuf::from(fallback);

    if tokio::fs::try_exists(&fallback).await? {
        debug!(path = %fallback.display(), "using fallback container extension");
        return Ok(fallback);
    }

    Err(StageError::DownloadOutputMissing {
        path: base.to_path_buf(),
    }
    .into())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::process::scripted::{ScriptedRunner, ScriptedStep};
    use tempfile::TempDir;

    fn naming() -> NamingPair {
        NamingPair {
            artist: "Artist".to_string(),
            title: "Song".to_string(),
        }
    }

    async fn acquire_with(
        dir: &TempDir,
        step: ScriptedStep,
    ) -> (Result<AcquiredMedia>, Vec<String>, Arc<ScriptedRunner>) {
        let runner = Arc::new(ScriptedRunner::new([step]));
        let stage = AcquisitionStage::new(runner.clone(), "yt-dlp", dir.path());
        let mut progress = Vec::new();
        let result = stage
            .acquire(
                "https://media.example/v",
                &naming(),
                &CancellationToken::new(),
                &mut |line: &str| progress.push(line.to_string()),
            )
            .await;
        (result, progress, runner)
    }

    #[tokio::test]
    async fn returns_exact_destination_when_present() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("Artist-Song");

        let (result, _, runner) =
            acquire_with(&dir, ScriptedStep::exits(0).creates(&base)).await;

        assert_eq!(result.unwrap().path(), base);
        assert_eq!(
            runner.calls()[0].args,
            vec![
                "-o".to_string(),
                base.to_string_lossy().into_owned(),
                "https://media.example/v".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn falls_back_to_webm_extension() {
        let dir = TempDir::new().unwrap();
        let webm = dir.path().join("Artist-Song.webm");

        let (result, _, _) = acquire_with(&dir, ScriptedStep::exits(0).creates(&webm)).await;

        assert_eq!(result.unwrap().path(), webm);
    }

    #[tokio::test]
    async fn missing_output_is_reported_with_base_path() {
        let dir = TempDir::new().unwrap();

        let (result, _, _) = acquire_with(&dir, ScriptedStep::exits(0)).await;

        match result {
            Err(Error::Stage(StageError::DownloadOutputMissing { path })) => {
                assert_eq!(path, dir.path().join("Artist-Song"));
            }
            other => panic!("expected DownloadOutputMissing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_zero_exit_is_download_failed() {
        let dir = TempDir::new().unwrap();
        let partial = dir.path().join("Artist-Song.webm.part");

        let (result, _, _) = acquire_with(
            &dir,
            ScriptedStep::exits(1)
                .stderr("ERROR: HTTP Error 403")
                .creates(&partial),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::Stage(StageError::DownloadFailed { exit_code: Some(1) }))
        ));
        // partial output is left alone
        assert!(partial.exists());
    }

    #[tokio::test]
    async fn start_message_precedes_downloader_lines() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("Artist-Song");

        let (_, progress, _) = acquire_with(
            &dir,
            ScriptedStep::exits(0)
                .stdout("[download]  10.0% of 3.00MiB")
                .stdout("[download] 100% of 3.00MiB")
                .stderr("WARNING: slow connection")
                .creates(&base),
        )
        .await;

        assert_eq!(
            progress,
            vec![
                START_MESSAGE,
                "[download]  10.0% of 3.00MiB",
                "[download] 100% of 3.00MiB",
                "WARNING: slow connection"
            ]
        );
    }

    #[tokio::test]
    async fn percent_signs_are_escaped_in_the_output_template() {
        let dir = TempDir::new().unwrap();
        let naming = NamingPair {
            artist: "A".to_string(),
            title: "50%(id)s".to_string(),
        };
        let webm = dir.path().join("A-50%(id)s.webm");
        let runner = Arc::new(ScriptedRunner::new([ScriptedStep::exits(0).creates(&webm)]));
        let stage = AcquisitionStage::new(runner.clone(), "yt-dlp", dir.path());

        let media = stage
            .acquire(
                "https://media.example/v",
                &naming,
                &CancellationToken::new(),
                &mut |_: &str| {},
            )
            .await
            .unwrap();

        assert_eq!(media.path(), webm);
        assert_eq!(
            runner.calls()[0].args[1],
            dir.path()
                .join("A-50%%(id)s")
                .to_string_lossy()
                .into_owned()
        );
    }

    #[tokio::test]
    async fn dots_in_the_title_are_kept() {
        let dir = TempDir::new().unwrap();
        let naming = NamingPair {
            artist: "Mr. Oizo".to_string(),
            title: "Flat Beat 1.0".to_string(),
        };
        let webm = dir.path().join("Mr. Oizo-Flat Beat 1.0.webm");
        let runner = Arc::new(ScriptedRunner::new([ScriptedStep::exits(0).creates(&webm)]));
        let stage = AcquisitionStage::new(runner, "yt-dlp", dir.path());

        let media = stage
            .acquire(
                "https://media.example/v",
                &naming,
                &CancellationToken::new(),
                &mut |_: &str| {},
            )
            .await
            .unwrap();

        assert_eq!(media.path(), webm);
    }
}
