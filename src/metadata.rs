//! Media metadata lookup and output naming
//!
//! The downloader is asked for a JSON dump of the media's metadata, from which
//! an (artist, title) pair is derived. Both halves are sanitized so they can be
//! embedded in a single file name component on any platform.

use crate::error::{Result, StageError};
use crate::process::ProcessRunner;
use crate::types::{MediaMetadata, NamingPair};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Artist used when neither the title nor the uploader provides one
pub const UNKNOWN_ARTIST: &str = "UnknownArtist";

/// Title used when the metadata has none
pub const UNKNOWN_TITLE: &str = "UnknownTitle";

/// Separator between artist and title inside a media title ("Artist - Song")
pub const TITLE_SEPARATOR: char = '-';

/// Characters that are not allowed in a file name component
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Resolves naming information for a media URL via the downloader
#[derive(Clone)]
pub struct MetadataResolver {
    runner: Arc<dyn ProcessRunner>,
    ytdlp: PathBuf,
}

impl MetadataResolver {
    /// Create a resolver that invokes the downloader at `ytdlp`
    pub fn new(runner: Arc<dyn ProcessRunner>, ytdlp: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            ytdlp: ytdlp.into(),
        }
    }

    /// Fetch metadata for `url` and derive the sanitized naming pair
    ///
    /// Output of the metadata dump is buffered, not broadcast.
    ///
    /// # Errors
    ///
    /// - [`StageError::MetadataParse`] if the downloader exits non-zero or its
    ///   output is not valid JSON
    /// - [`crate::Error::Launch`] if the downloader cannot be started
    /// - [`crate::Error::Cancelled`] if `cancel` fires
    pub async fn resolve(&self, url: &str, cancel: &CancellationToken) -> Result<NamingPair> {
        let args = [
            OsString::from("--dump-json"),
            OsString::from("--"),
            OsString::from(url),
        ];

        tracing::debug!(url = %url, runner = self.runner.name(), "fetching media metadata");

        let outcome = self
            .runner
            .run(&self.ytdlp, &args, cancel, &mut |_: &str| {})
            .await?;

        if !outcome.success() {
            tracing::warn!(url = %url, exit_code = ?outcome.exit_code, "metadata dump failed");
            return Err(StageError::MetadataParse {
                reason: format!(
                    "downloader exited with status {}",
                    outcome
                        .exit_code
                        .map_or_else(|| "signal".to_string(), |c| c.to_string())
                ),
                stderr: outcome.stderr(),
            }
            .into());
        }

        let metadata: MediaMetadata =
            serde_json::from_str(&outcome.stdout()).map_err(|e| StageError::MetadataParse {
                reason: format!("invalid metadata JSON: {e}"),
                stderr: outcome.stderr(),
            })?;

        let naming = derive_naming(&metadata);
        tracing::info!(
            url = %url,
            artist = %naming.artist,
            title = %naming.title,
            "resolved media naming"
        );
        Ok(naming)
    }
}

/// Derive a sanitized (artist, title) pair from raw metadata
///
/// A title of the form `"Artist - Song"` is split at the first `-`; otherwise
/// the uploader is the artist. Empty parts fall back to [`UNKNOWN_ARTIST`] and
/// [`UNKNOWN_TITLE`].
///
/// # Examples
///
/// ```
/// use audio_fetch::metadata::derive_naming;
/// use audio_fetch::MediaMetadata;
///
/// let meta = MediaMetadata {
///     title: Some("Artist - Song".to_string()),
///     uploader: Some("Channel".to_string()),
/// };
/// let naming = derive_naming(&meta);
/// assert_eq!(naming.artist, "Artist");
/// assert_eq!(naming.title, "Song");
/// ```
pub fn derive_naming(metadata: &MediaMetadata) -> NamingPair {
    let title = metadata.title.as_deref().unwrap_or_default();

    let (artist, title) = match title.split_once(TITLE_SEPARATOR) {
        Some((artist, title)) => (artist.trim(), title.trim()),
        None => (
            metadata.uploader.as_deref().unwrap_or_default().trim(),
            title.trim(),
        ),
    };

    NamingPair {
        artist: component_or(artist, UNKNOWN_ARTIST),
        title: component_or(title, UNKNOWN_TITLE),
    }
}

fn component_or(raw: &str, placeholder: &str) -> String {
    if raw.is_empty() {
        placeholder.to_string()
    } else {
        sanitize_file_component(raw)
    }
}

/// Replace every character that is illegal in a file name with `_`
///
/// Covers path separators, the Windows-reserved set and control characters.
pub fn sanitize_file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
