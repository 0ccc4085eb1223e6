//! Core types for audio-fetch

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

/// A request to turn a remote media URL into an audio file
///
/// Exists only for the duration of one pipeline invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobRequest {
    /// Remote media URL handed to the downloader
    pub source_url: String,
}

impl JobRequest {
    /// Create a new job request
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }
}

/// Subset of the downloader's JSON metadata dump used for naming
///
/// Every other field of the dump is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MediaMetadata {
    /// Media title, possibly "Artist - Title"
    #[serde(default)]
    pub title: Option<String>,
    /// Channel or account that published the media
    #[serde(default)]
    pub uploader: Option<String>,
}

/// Sanitized (artist, title) pair used to name output files
///
/// Both fields are safe to embed in a single file name component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NamingPair {
    /// Sanitized artist name
    pub artist: String,
    /// Sanitized title
    pub title: String,
}

impl NamingPair {
    /// File name without extension: `"{artist}-{title}"`
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.artist, self.title)
    }
}

/// Downloaded media waiting to be transcoded
///
/// Owned by the running job; the transcoding stage consumes it and takes over
/// responsibility for deleting the file.
#[must_use]
#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct AcquiredMedia {
    /// On-disk location of the downloaded container
    #[schema(value_type = String)]
    pub path: PathBuf,
}

impl AcquiredMedia {
    /// Wrap a path produced by the downloader
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the downloaded file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Final audio artifact returned to the caller
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct TranscodedAudio {
    /// On-disk location of the audio file
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Set when the source file could not be removed after a successful transcode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_warning: Option<String>,
}

impl TranscodedAudio {
    /// File name of the artifact, as accepted by the artifact retrieval interface
    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// A single line of progress text relayed to observers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProgressEvent {
    /// Raw process output line or a synthetic status message
    pub text: String,
}

impl ProgressEvent {
    /// Create a progress event
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for ProgressEvent {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Result of one external-process invocation
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code (None if the process was terminated by a signal)
    pub exit_code: Option<i32>,
    /// Lines read from stdout, in order
    pub stdout_lines: Vec<String>,
    /// Lines read from stderr, in order
    pub stderr_lines: Vec<String>,
}

impl ProcessOutcome {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Captured stdout joined with newlines
    pub fn stdout(&self) -> String {
        self.stdout_lines.join("\n")
    }

    /// Captured stderr joined with newlines
    pub fn stderr(&self) -> String {
        self.stderr_lines.join("\n")
    }
}

/// Pipeline stage, used for logging and error context
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Downloader metadata dump
    Metadata,
    /// Downloader fetch
    Acquisition,
    /// Transcoder conversion
    Transcoding,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Metadata => "metadata",
            Stage::Acquisition => "acquisition",
            Stage::Transcoding => "transcoding",
        };
        f.write_str(name)
    }
}

/// A produced audio file, opened for streaming
#[derive(Debug)]
pub struct Artifact {
    /// File name inside the download directory
    pub file_name: String,
    /// Audio MIME type derived from the extension
    pub content_type: &'static str,
    /// Size in bytes
    pub len: u64,
    /// Handle positioned at the start of the file
    pub file: tokio::fs::File,
}
