//! Error types for audio-fetch
//!
//! This module provides error handling for the library, including:
//! - Stage-specific error types (metadata, acquisition, transcoding)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//! - Context information (exit code, file path, captured stderr)

use crate::types::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for audio-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for audio-fetch
///
/// Every pipeline failure surfaces as one of these variants. A failing stage
/// aborts the rest of its job; nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "ytdlp_path")
        key: Option<String>,
    },

    /// Request rejected before any stage ran (empty URL, bad path, etc.)
    #[error("validation error: {0}")]
    Validation(String),

    /// External executable could not be started
    #[error("failed to launch {}: {reason}", .program.display())]
    Launch {
        /// The executable that failed to start
        program: PathBuf,
        /// The underlying OS error
        reason: String,
    },

    /// A pipeline stage failed
    #[error("stage error: {0}")]
    Stage(#[from] StageError),

    /// Requested artifact does not exist
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// The transcoder output would replace an existing file
    #[error("output file already exists: {}", .path.display())]
    OutputExists {
        /// The existing file
        path: PathBuf,
    },

    /// Job was cancelled before it finished
    #[error("job cancelled")]
    Cancelled,

    /// Job exceeded the configured timeout
    #[error("job timed out after {after:?}")]
    TimedOut {
        /// The timeout that was exceeded
        after: Duration,
    },

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Failures reported by the external-process stages
#[derive(Debug, Error)]
pub enum StageError {
    /// Metadata dump failed or produced unparseable output
    #[error("failed to read media metadata: {reason}")]
    MetadataParse {
        /// Why the metadata could not be used
        reason: String,
        /// Captured stderr of the downloader, kept for diagnosis
        stderr: String,
    },

    /// Downloader exited with a non-zero status
    #[error("downloader exited with status {}", display_code(.exit_code))]
    DownloadFailed {
        /// Exit code (None if terminated by a signal)
        exit_code: Option<i32>,
    },

    /// Downloader reported success but no output file was found
    #[error("downloaded file not found at {} (or with .webm extension)", .path.display())]
    DownloadOutputMissing {
        /// The destination path that was expected
        path: PathBuf,
    },

    /// Transcoder exited with a non-zero status
    #[error("transcoder exited with status {} for {}", display_code(.exit_code), .input.display())]
    TranscodeFailed {
        /// Exit code (None if terminated by a signal)
        exit_code: Option<i32>,
        /// The source file, left on disk
        input: PathBuf,
    },
}

impl StageError {
    /// The pipeline stage that failed
    pub fn stage(&self) -> Stage {
        match self {
            StageError::MetadataParse { .. } => Stage::Metadata,
            StageError::DownloadFailed { .. } | StageError::DownloadOutputMissing { .. } => {
                Stage::Acquisition
            }
            StageError::TranscodeFailed { .. } => Stage::Transcoding,
        }
    }

    fn details(&self) -> serde_json::Value {
        let mut details = serde_json::json!({ "stage": self.stage() });
        match self {
            StageError::MetadataParse { stderr, .. } => {
                if !stderr.is_empty() {
                    details["stderr"] = serde_json::json!(stderr);
                }
            }
            StageError::DownloadFailed { exit_code } => {
                details["exit_code"] = serde_json::json!(exit_code);
            }
            StageError::DownloadOutputMissing { path } => {
                details["path"] = serde_json::json!(path);
            }
            StageError::TranscodeFailed { exit_code, input } => {
                details["exit_code"] = serde_json::json!(exit_code);
                details["input"] = serde_json::json!(input);
            }
        }
        details
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "download_failed",
///     "message": "stage error: downloader exited with status 1",
///     "details": {
///       "exit_code": 1
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::ArtifactNotFound(_) => 404,

            // 409 Conflict
            Error::OutputExists { .. } => 409,

            // 422 Unprocessable Entity - the remote media could not be processed
            Error::Stage(StageError::MetadataParse { .. }) => 422,

            // 502 Bad Gateway - external tool reported failure
            Error::Stage(StageError::DownloadFailed { .. }) => 502,
            Error::Stage(StageError::DownloadOutputMissing { .. }) => 502,
            Error::Stage(StageError::TranscodeFailed { .. }) => 502,

            // Interrupted jobs
            Error::Cancelled => 503,
            Error::ShuttingDown => 503,
            Error::TimedOut { .. } => 504,

            // 500 Internal Server Error
            Error::Config { .. } => 500,
            Error::Launch { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Launch { .. } => "launch_error",
            Error::Stage(e) => match e {
                StageError::MetadataParse { .. } => "metadata_parse_error",
                StageError::DownloadFailed { .. } => "download_failed",
                StageError::DownloadOutputMissing { .. } => "download_output_missing",
                StageError::TranscodeFailed { .. } => "transcode_failed",
            },
            Error::ArtifactNotFound(_) => "artifact_not_found",
            Error::OutputExists { .. } => "output_exists",
            Error::Cancelled => "cancelled",
            Error::TimedOut { .. } => "timed_out",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let details = match &error {
            Error::Stage(stage_error) => Some(stage_error.details()),
            Error::OutputExists { path } => Some(serde_json::json!({
                "path": path,
            })),
            Error::Launch { program, .. } => Some(serde_json::json!({
                "program": program,
            })),
            Error::TimedOut { after } => Some(serde_json::json!({
                "timeout_secs": after.as_secs(),
            })),
            _ => None,
        };

        let mut api_error = ApiError::new(error.error_code(), error.to_string());
        api_error.error.details = details;
        api_error
    }
}
