//! Common test utilities for audio-fetch integration tests
//!
//! The downloader and transcoder are replaced by small shell scripts that
//! mimic the command lines and output of yt-dlp and ffmpeg.

#![allow(dead_code)]

use audio_fetch::{AudioFetcher, CliProcessRunner, Config, ProgressHub};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Metadata dump for a title in "Artist - Title" form
pub const ARTIST_SONG_JSON: &str =
    r#"{"id":"abc123","title":"Artist - Song","uploader":"Some Channel","duration":200}"#;

/// Downloader that prints `metadata` for `--dump-json` and otherwise writes
/// `{base}.webm`, printing progress with carriage returns like yt-dlp does
pub fn ytdlp_writing_webm(metadata: &str) -> String {
    format!(
        r#"
echo "$@" >> "$0.calls"
if [ "$1" = "--dump-json" ]; then
  echo '{metadata}'
  exit 0
fi
out="$2"
printf '[download] Destination: %s.webm\n' "$out"
printf '[download]  50.0%% of 1.00MiB\r[download] 100.0%% of 1.00MiB\n'
echo "WARNING: falling back to generic extractor" >&2
printf 'webm-bytes' > "$out.webm"
"#
    )
}

/// Transcoder that copies its input to its output, logging to stderr
pub const FFMPEG_COPYING: &str = r#"
echo "$@" >> "$0.calls"
in="$2"
out="$7"
echo "Input #0, matroska,webm, from '$in':" >&2
echo "size=       1kB time=00:00:01.00 bitrate=   8.0kbits/s speed=50x" >&2
cp "$in" "$out"
"#;

/// Write an executable `/bin/sh` script named `name` into `dir`
pub fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Command lines a script was invoked with, one per call
pub fn calls(tool: &Path) -> Vec<String> {
    let mut log = tool.as_os_str().to_owned();
    log.push(".calls");
    std::fs::read_to_string(PathBuf::from(log))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// A fetcher wired to fake tools inside a private temp directory
pub struct FakeTools {
    pub temp_dir: TempDir,
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub config: Config,
}

impl FakeTools {
    pub fn new(ytdlp_body: &str, ffmpeg_body: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let bin = temp_dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();

        let ytdlp = write_tool(&bin, "yt-dlp", ytdlp_body);
        let ffmpeg = write_tool(&bin, "ffmpeg", ffmpeg_body);

        let mut config = Config::default();
        config.download.download_dir = temp_dir.path().join("downloads");
        config.tools.ytdlp_path = Some(ytdlp.clone());
        config.tools.ffmpeg_path = Some(ffmpeg.clone());
        config.tools.search_path = false;

        Self {
            temp_dir,
            ytdlp,
            ffmpeg,
            config,
        }
    }

    /// Build a fetcher with its own progress hub
    pub async fn fetcher(&self) -> (AudioFetcher, ProgressHub) {
        let hub = ProgressHub::new(256);
        let fetcher = AudioFetcher::with_runner(
            self.config.clone(),
            Arc::new(CliProcessRunner::new()),
            hub.clone(),
        )
        .await
        .unwrap();
        (fetcher, hub)
    }
}
