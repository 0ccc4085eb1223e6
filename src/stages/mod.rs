//! Pipeline stages backed by external executables
//!
//! Each job runs its stages strictly in order:
//! 1. Acquisition - the downloader fetches the media into the download directory
//! 2. Transcoding - the transcoder extracts the audio track and the source is removed
//!
//! Stages report progress through a per-call callback; the caller decides
//! where the lines go (normally the [`ProgressHub`](crate::progress::ProgressHub)).

mod acquisition;
mod transcode;

pub use acquisition::{AcquisitionStage, FALLBACK_EXTENSION, START_MESSAGE};
pub use transcode::TranscodingStage;
