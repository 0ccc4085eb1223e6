//! Pipeline service: URL in, audio file out
//!
//! [`AudioFetcher`] wires the metadata resolver and the two stages together,
//! relays every output line to the progress hub, and enforces the per-job
//! timeout and the service-wide shutdown.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::MetadataResolver;
use crate::process::{CliProcessRunner, ProcessRunner};
use crate::progress::{ObserverHandle, ProgressHub};
use crate::stages::{AcquisitionStage, TranscodingStage};
use crate::types::{AcquiredMedia, Artifact, JobRequest, NamingPair, Stage, TranscodedAudio};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long [`AudioFetcher::shutdown`] waits for running jobs to unwind
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Downloads remote media and converts it to audio
///
/// Cheap to clone; clones share the same stages, hub and shutdown state.
///
/// # Example
///
/// ```no_run
/// use audio_fetch::{AudioFetcher, Config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let fetcher = AudioFetcher::new(Config::from_json_file("appsettings.json")?).await?;
///
///     let mut progress = fetcher.subscribe();
///     tokio::spawn(async move {
///         while let Some(event) = progress.recv().await {
///             println!("{}", event.text);
///         }
///     });
///
///     let audio = fetcher.process("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
///     println!("saved to {}", audio.path.display());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct AudioFetcher {
    config: Arc<Config>,
    /// Canonical, absolute download directory
    download_dir: PathBuf,
    resolver: MetadataResolver,
    acquisition: AcquisitionStage,
    transcoding: TranscodingStage,
    hub: ProgressHub,
    jobs: JobControl,
}

/// Shutdown flag, cancellation root and running-job count
#[derive(Clone, Default)]
struct JobControl {
    shutting_down: Arc<AtomicBool>,
    cancel: CancellationToken,
    active: Arc<AtomicUsize>,
}

/// Decrements the running-job count when a job ends, however it ends
struct ActiveJob {
    active: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AudioFetcher {
    /// Create a fetcher that runs the real downloader and transcoder
    ///
    /// Progress goes to the process-wide hub ([`ProgressHub::global`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid, an executable
    /// cannot be found, or the download directory cannot be created.
    pub async fn new(config: Config) -> Result<Self> {
        let hub = ProgressHub::init_global(config.progress.channel_capacity).clone();
        Self::with_runner(config, Arc::new(CliProcessRunner::new()), hub).await
    }

    /// Create a fetcher with an explicit process runner and progress hub
    pub async fn with_runner(
        config: Config,
        runner: Arc<dyn ProcessRunner>,
        hub: ProgressHub,
    ) -> Result<Self> {
        config.validate()?;
        let tools = config.resolve_tools()?;

        let download_dir = prepare_download_dir(config.download_dir()).await?;

        tracing::info!(
            download_dir = %download_dir.display(),
            ytdlp = %tools.ytdlp.display(),
            ffmpeg = %tools.ffmpeg.display(),
            runner = runner.name(),
            "audio fetcher ready"
        );

        Ok(Self {
            resolver: MetadataResolver::new(runner.clone(), &tools.ytdlp),
            acquisition: AcquisitionStage::new(runner.clone(), &tools.ytdlp, &download_dir),
            transcoding: TranscodingStage::new(runner, &tools.ffmpeg),
            config: Arc::new(config),
            download_dir,
            hub,
            jobs: JobControl::default(),
        })
    }

    /// Run the full pipeline for `url`
    ///
    /// Resolves the naming pair, downloads the media, converts it to
    /// `{artist}-{title}.{audio_extension}` and deletes the download.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `url` is empty or not an http(s) URL
    /// - [`Error::OutputExists`] if the named audio file is already there; no
    ///   download is started
    /// - [`Error::Stage`] from whichever stage failed; later stages never run
    /// - [`Error::TimedOut`], [`Error::Cancelled`] or [`Error::ShuttingDown`]
    pub async fn process(&self, url: &str) -> Result<TranscodedAudio> {
        let request = validate_url(url)?;
        let job = self.begin_job()?;

        tracing::info!(url = %request.source_url, "job started");
        let result = self
            .bounded(async {
                let naming = self.resolve_naming(&request, &job.cancel).await?;
                let output = self.output_path(&naming.file_stem());
                if tokio::fs::try_exists(&output).await? {
                    return Err(Error::OutputExists { path: output });
                }
                let media = self.acquire_media(&request, &naming, &job.cancel).await?;
                self.transcode_media(media, &output, &job.cancel).await
            })
            .await;

        match &result {
            Ok(audio) => tracing::info!(
                url = %request.source_url,
                path = %audio.path.display(),
                "job finished"
            ),
            Err(e) => tracing::warn!(url = %request.source_url, error = %e, "job failed"),
        }
        result
    }

    /// Download `url` without converting it
    ///
    /// The returned media stays in the download directory and can be handed
    /// to [`AudioFetcher::convert`] later.
    pub async fn download(&self, url: &str) -> Result<AcquiredMedia> {
        let request = validate_url(url)?;
        let job = self.begin_job()?;

        let result = self
            .bounded(async {
                let naming = self.resolve_naming(&request, &job.cancel).await?;
                self.acquire_media(&request, &naming, &job.cancel).await
            })
            .await;

        if let Err(e) = &result {
            tracing::warn!(url = %request.source_url, error = %e, "download failed");
        }
        result
    }

    /// Convert a previously downloaded file
    ///
    /// A media container extension (such as the `.webm` fallback) is
    /// replaced by the configured audio extension; any other name gets the
    /// audio extension appended, matching what [`AudioFetcher::process`]
    /// produces. The source file is deleted on success.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `path` is empty, missing, not a file, outside
    ///   the download directory, or already has the audio extension
    /// - [`Error::OutputExists`] if the converted file is already there
    /// - [`Error::Stage`] if the transcoder fails
    pub async fn convert(&self, path: impl AsRef<Path>) -> Result<TranscodedAudio> {
        let input = self.validate_media_path(path.as_ref()).await?;
        let output = self.converted_path(&input);
        if output == input {
            return Err(Error::Validation(format!(
                "{} already has the .{} extension",
                input.display(),
                self.config.download.audio_extension
            )));
        }

        let job = self.begin_job()?;
        self.bounded(self.transcode_media(AcquiredMedia::new(input), &output, &job.cancel))
            .await
    }

    /// Open a produced audio file from the download directory
    ///
    /// Only files carrying the configured audio extension are served, so raw
    /// downloads and partial files are never exposed.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `file_name` is not a plain file name
    /// - [`Error::ArtifactNotFound`] if no such audio file exists
    pub async fn open_artifact(&self, file_name: &str) -> Result<Artifact> {
        if !is_plain_file_name(file_name) {
            return Err(Error::Validation(format!(
                "'{file_name}' is not a plain file name"
            )));
        }

        let not_found = || Error::ArtifactNotFound(file_name.to_string());
        let path = self.download_dir.join(file_name);
        let content_type = self.audio_content_type(&path).ok_or_else(not_found)?;

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        tracing::debug!(file_name, size = metadata.len(), "serving artifact");
        Ok(Artifact {
            file_name: file_name.to_string(),
            content_type,
            len: metadata.len(),
            file,
        })
    }

    /// Attach an observer to this fetcher's progress hub
    pub fn subscribe(&self) -> ObserverHandle {
        self.hub.subscribe()
    }

    /// The progress hub this fetcher publishes to
    pub fn hub(&self) -> &ProgressHub {
        &self.hub
    }

    /// Current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Canonical download directory
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Token that fires when [`AudioFetcher::shutdown`] is called
    pub fn shutdown_token(&self) -> CancellationToken {
        self.jobs.cancel.clone()
    }

    /// Number of jobs currently running
    pub fn active_jobs(&self) -> usize {
        self.jobs.active.load(Ordering::SeqCst)
    }

    /// Stop accepting jobs and cancel the running ones
    ///
    /// New requests fail with [`Error::ShuttingDown`]. Running jobs have their
    /// processes killed and fail with [`Error::Cancelled`]; this waits up to
    /// 30 seconds for them to unwind.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.jobs.shutting_down.store(true, Ordering::SeqCst);
        self.jobs.cancel.cancel();

        if tokio::time::timeout(SHUTDOWN_GRACE, self.wait_for_active_jobs())
            .await
            .is_err()
        {
            tracing::warn!(
                active = self.active_jobs(),
                "Timeout waiting for jobs to stop, proceeding with shutdown"
            );
        }

        tracing::info!("Shutdown complete");
        Ok(())
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active = self.active_jobs();
            if active == 0 {
                return;
            }
            tracing::debug!(active, "Waiting for active jobs to stop");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn begin_job(&self) -> Result<ActiveJob> {
        if self.jobs.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        self.jobs.active.fetch_add(1, Ordering::SeqCst);
        Ok(ActiveJob {
            active: Arc::clone(&self.jobs.active),
            cancel: self.jobs.cancel.child_token(),
        })
    }

    /// Apply the configured job timeout
    ///
    /// Dropping the job on timeout drops the running process future, which
    /// kills the child.
    async fn bounded<T>(&self, job: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.download.job_timeout {
            Some(after) => tokio::time::timeout(after, job)
                .await
                .map_err(|_| Error::TimedOut { after })?,
            None => job.await,
        }
    }

    async fn resolve_naming(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<NamingPair> {
        tracing::debug!(url = %request.source_url, stage = ?Stage::Metadata, "stage started");
        self.resolver.resolve(&request.source_url, cancel).await
    }

    async fn acquire_media(
        &self,
        request: &JobRequest,
        naming: &NamingPair,
        cancel: &CancellationToken,
    ) -> Result<AcquiredMedia> {
        let url = request.source_url.as_str();
        tracing::debug!(url, stage = ?Stage::Acquisition, "stage started");
        let hub = self.hub.clone();
        let mut publish = move |line: &str| {
            hub.publish(line);
        };
        self.acquisition
            .acquire(url, naming, cancel, &mut publish)
            .await
    }

    async fn transcode_media(
        &self,
        media: AcquiredMedia,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscodedAudio> {
        tracing::debug!(input = %media.path().display(), stage = ?Stage::Transcoding, "stage started");
        let hub = self.hub.clone();
        let mut publish = move |line: &str| {
            hub.publish(line);
        };
        self.transcoding
            .transcode(media, output, cancel, &mut publish)
            .await
    }

    fn audio_content_type(&self, path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?;
        if !ext.eq_ignore_ascii_case(&self.config.download.audio_extension) {
            return None;
        }
        content_type_for(ext)
    }

    fn converted_path(&self, input: &Path) -> PathBuf {
        let base = match input.extension().and_then(|e| e.to_str()) {
            Some(ext) if is_media_extension(ext) => input.with_extension(""),
            _ => input.to_path_buf(),
        };
        let mut name = base.into_os_string();
        name.push(".");
        name.push(&self.config.download.audio_extension);
        PathBuf::from(name)
    }

    fn output_path(&self, stem: &str) -> PathBuf {
        // appended rather than set so dots inside the title survive
        self.download_dir
            .join(format!("{stem}.{}", self.config.download.audio_extension))
    }

    async fn validate_media_path(&self, path: &Path) -> Result<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(Error::Validation("path must not be empty".to_string()));
        }

        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.download_dir.join(path)
        };

        let canonical = match tokio::fs::canonicalize(&candidate).await {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Validation(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if !canonical.starts_with(&self.download_dir) {
            return Err(Error::Validation(format!(
                "{} is outside the download directory",
                path.display()
            )));
        }
        if !tokio::fs::metadata(&canonical).await?.is_file() {
            return Err(Error::Validation(format!("{} is not a file", path.display())));
        }

        Ok(canonical)
    }
}

/// Check that `url` is a non-empty absolute http(s) URL
pub fn validate_url(url: &str) -> Result<JobRequest> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("URL must not be empty".to_string()));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::Validation(format!("invalid URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(JobRequest::new(trimmed))
}

async fn prepare_download_dir(dir: &Path) -> Result<PathBuf> {
    let config_error = |action: &str, e: std::io::Error| Error::Config {
        message: format!("cannot {action} download directory '{}': {e}", dir.display()),
        key: Some("download_dir".to_string()),
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| config_error("create", e))?;
    tokio::fs::canonicalize(dir)
        .await
        .map_err(|e| config_error("resolve", e))
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(['/', '\\'])
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}

/// Container and audio extensions the downloader may produce
const MEDIA_EXTENSIONS: &[&str] = &[
    "webm", "mkv", "mp4", "m4a", "mov", "flv", "3gp", "mp3", "aac", "ogg", "oga", "opus", "flac",
    "wav",
];

fn is_media_extension(extension: &str) -> bool {
    MEDIA_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(extension))
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    let content_type = match extension.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(content_type)
}
