//! # audio-fetch
//!
//! Turn remote media URLs into local audio files, with live progress.
//!
//! A job runs an external downloader (yt-dlp) to fetch the media, then an
//! external transcoder (ffmpeg) to extract the audio track. Every output line
//! of both tools is relayed to any number of observers while the job runs.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - The pipeline is a plain async API; the REST/SSE
//!   server in [`api`] is an optional thin adapter over it
//! - **Streaming progress** - Observers see each tool line as it is printed,
//!   not after the process exits
//! - **Fail fast** - A failing stage aborts the rest of its job; nothing is
//!   retried
//!
//! ## Quick Start
//!
//! ```no_run
//! use audio_fetch::{AudioFetcher, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = AudioFetcher::new(Config::from_json_file("appsettings.json")?).await?;
//!
//!     // Watch progress
//!     let mut progress = fetcher.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(event) = progress.recv().await {
//!             println!("{}", event.text);
//!         }
//!     });
//!
//!     let audio = fetcher.process("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//!     println!("Saved {}", audio.path.display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Pipeline service
pub mod fetcher;
/// Media metadata lookup and output naming
pub mod metadata;
/// External process execution
pub mod process;
/// Progress broadcast channel
pub mod progress;
/// Acquisition and transcoding stages
pub mod stages;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, StageError, ToHttpStatus};
pub use fetcher::AudioFetcher;
pub use process::{CliProcessRunner, LineSink, ProcessRunner};
pub use progress::{ObserverHandle, ProgressHub};
pub use types::{
    AcquiredMedia, Artifact, JobRequest, MediaMetadata, NamingPair, ProcessOutcome,
    ProgressEvent, Stage, TranscodedAudio,
};

/// Helper function to run the fetcher with graceful signal handling.
///
/// Waits for a termination signal and then calls the fetcher's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use audio_fetch::{AudioFetcher, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let fetcher = AudioFetcher::new(Config::from_json_file("appsettings.json")?).await?;
///
///     run_with_shutdown(fetcher).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(fetcher: AudioFetcher) -> Result<()> {
    wait_for_signal().await;
    fetcher.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
