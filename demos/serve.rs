//! REST API server demo
//!
//! Runs audio-fetch with the REST API enabled.
//!
//! ```text
//! cargo run --example serve -- [appsettings.json]
//! ```
//!
//! The optional settings file accepts the flat keys `DownloadFolder`,
//! `YtDlpPath` and `FfmpegPath` as well as the nested `api`/`progress`
//! sections. Without one, files go to `./downloads` and yt-dlp and ffmpeg
//! are looked up in PATH.
//!
//! After starting, you can:
//! - Convert a URL via POST http://localhost:6790/jobs
//! - Stream progress via GET http://localhost:6790/progress
//! - Download the result via GET http://localhost:6790/artifacts/{file_name}

use audio_fetch::api::start_api_server;
use audio_fetch::{AudioFetcher, Config, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("audio_fetch=info".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(path)?,
        None => {
            let mut config = Config::default();
            config.download.download_dir = std::env::current_dir()?.join("downloads");
            config.tools.search_path = true;
            config
        }
    };
    let bind_address = config.api.bind_address;

    let fetcher = Arc::new(AudioFetcher::new(config).await?);
    let server = tokio::spawn(start_api_server(fetcher.clone(), fetcher.get_config()));

    println!("audio-fetch listening on http://{bind_address}");
    println!();
    println!("Example commands:");
    println!("  # Convert a video to mp3 (blocks until done)");
    println!("  curl -X POST http://{bind_address}/jobs \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"url\": \"https://www.youtube.com/watch?v=dQw4w9WgXcQ\"}}'");
    println!();
    println!("  # Watch progress (Server-Sent Events)");
    println!("  curl -N http://{bind_address}/progress");
    println!();
    println!("Press Ctrl+C to stop");

    run_with_shutdown((*fetcher).clone()).await?;
    server.await??;

    Ok(())
}
