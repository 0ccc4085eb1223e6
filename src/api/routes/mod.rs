//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Full pipeline, download-only and convert-only jobs
//! - [`artifacts`] - Produced audio files
//! - [`system`] - Health, progress stream, OpenAPI

use crate::types::{AcquiredMedia, TranscodedAudio};
use serde::{Deserialize, Serialize};

mod artifacts;
mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use artifacts::*;
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /jobs and POST /downloads
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitUrlRequest {
    /// Remote media URL (http or https)
    pub url: String,
}

/// Request body for POST /conversions
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConvertRequest {
    /// Previously downloaded file, absolute or relative to the download directory
    pub path: String,
}

/// Response body for a finished audio job
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AudioJobResponse {
    /// Absolute path of the audio file on the server
    pub path: String,
    /// File name to pass to `GET /artifacts/:name`
    pub file_name: Option<String>,
    /// Set when the downloaded source could not be deleted
    pub cleanup_warning: Option<String>,
}

impl From<TranscodedAudio> for AudioJobResponse {
    fn from(audio: TranscodedAudio) -> Self {
        Self {
            file_name: audio.file_name(),
            path: audio.path.to_string_lossy().into_owned(),
            cleanup_warning: audio.cleanup_warning,
        }
    }
}

/// Response body for a finished download-only job
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// Absolute path of the downloaded media on the server
    pub path: String,
}

impl From<AcquiredMedia> for DownloadResponse {
    fn from(media: AcquiredMedia) -> Self {
        Self {
            path: media.path.to_string_lossy().into_owned(),
        }
    }
}
