//! Configuration types for audio-fetch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};
use utoipa::ToSchema;

/// Download behavior configuration (directories, output format, timeouts)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Absolute directory that receives downloaded media and transcoded audio
    /// (required)
    #[serde(default, alias = "DownloadFolder")]
    pub download_dir: PathBuf,

    /// Extension of the transcoded audio file, which also selects the
    /// transcoder's output format (default: "mp3")
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    /// Upper bound for a whole job; child processes are killed when it expires
    /// (default: None = unlimited)
    #[serde(
        default,
        with = "optional_duration_serde",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<u64>)]
    pub job_timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::new(),
            audio_extension: default_audio_extension(),
            job_timeout: None,
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (required unless `search_path` is set)
    #[serde(default, alias = "YtDlpPath")]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (required unless `search_path` is set)
    #[serde(default, alias = "FfmpegPath")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: false)
    #[serde(default)]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: false,
        }
    }
}

/// Progress broadcast configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProgressConfig {
    /// Events buffered per observer before a slow observer starts skipping (default: 1000)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for [`AudioFetcher`](crate::AudioFetcher)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig): directories, output format, job timeout
/// - [`tools`](ToolsConfig): external binary paths
/// - [`progress`](ProgressConfig): broadcast channel sizing
/// - [`api`](ApiConfig): REST server settings
///
/// `download` and `tools` are flattened, so a flat settings file such as
/// `{"DownloadFolder": "...", "YtDlpPath": "...", "FfmpegPath": "..."}`
/// deserializes directly.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Progress broadcast settings
    #[serde(default)]
    pub progress: ProgressConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load configuration from a JSON settings file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read settings file '{}': {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("invalid settings file '{}': {}", path.display(), e),
            key: None,
        })
    }

    /// Check settings that do not depend on the filesystem
    ///
    /// Tool discovery happens separately in [`Config::resolve_tools`].
    pub fn validate(&self) -> Result<()> {
        let download_dir = &self.download.download_dir;
        if download_dir.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "download directory (DownloadFolder) is required".to_string(),
                key: Some("download_dir".to_string()),
            });
        }
        if !download_dir.is_absolute() {
            return Err(Error::Config {
                message: format!(
                    "download directory '{}' must be an absolute path",
                    download_dir.display()
                ),
                key: Some("download_dir".to_string()),
            });
        }

        let ext = self.download.audio_extension.trim();
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(Error::Config {
                message: format!(
                    "audio extension '{}' must be a bare extension such as \"mp3\"",
                    self.download.audio_extension
                ),
                key: Some("audio_extension".to_string()),
            });
        }

        if self.progress.channel_capacity == 0 {
            return Err(Error::Config {
                message: "progress channel capacity must be at least 1".to_string(),
                key: Some("channel_capacity".to_string()),
            });
        }

        if self.download.job_timeout == Some(Duration::ZERO) {
            return Err(Error::Config {
                message: "job timeout must be greater than zero".to_string(),
                key: Some("job_timeout".to_string()),
            });
        }

        Ok(())
    }

    /// Resolve the downloader and transcoder executables
    ///
    /// Explicit paths win; otherwise PATH is searched when `search_path` is set.
    /// A tool that cannot be found is a startup error.
    pub fn resolve_tools(&self) -> Result<ResolvedTools> {
        let ytdlp = resolve_tool(
            self.tools.ytdlp_path.as_ref(),
            self.tools.search_path,
            YTDLP_BINARY,
            "ytdlp_path",
        )?;
        let ffmpeg = resolve_tool(
            self.tools.ffmpeg_path.as_ref(),
            self.tools.search_path,
            FFMPEG_BINARY,
            "ffmpeg_path",
        )?;
        Ok(ResolvedTools { ytdlp, ffmpeg })
    }
}

/// Executable paths after discovery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTools {
    /// Downloader executable
    pub ytdlp: PathBuf,
    /// Transcoder executable
    pub ffmpeg: PathBuf,
}

const YTDLP_BINARY: &str = "yt-dlp";
const FFMPEG_BINARY: &str = "ffmpeg";

fn resolve_tool(
    explicit: Option<&PathBuf>,
    search_path: bool,
    binary: &str,
    key: &str,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: format!("{binary} path must not be empty"),
                key: Some(key.to_string()),
            });
        }
        return Ok(path.clone());
    }

    if search_path && let Ok(found) = which::which(binary) {
        return Ok(found);
    }

    Err(Error::Config {
        message: format!("{binary} executable not configured and not found in PATH"),
        key: Some(key.to_string()),
    })
}

fn default_audio_extension() -> String {
    "mp3".to_string()
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
