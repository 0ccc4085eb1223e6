//! REST API server module
//!
//! A thin JSON/SSE adapter over [`AudioFetcher`]: submit jobs, watch progress
//! live, and fetch the produced audio files.

use crate::{AudioFetcher, Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /jobs` - Download a URL and convert it to audio
/// - `POST /downloads` - Download a URL without converting
/// - `POST /conversions` - Convert a previously downloaded file
///
/// ## Artifacts
/// - `GET /artifacts/:name` - Fetch a produced audio file
///
/// ## System
/// - `GET /progress` - Server-sent progress stream
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(fetcher: Arc<AudioFetcher>, config: Arc<Config>) -> Router {
    let state = AppState::new(fetcher);

    let router = Router::new()
        // Jobs
        .route("/jobs", post(routes::submit_job))
        .route("/downloads", post(routes::submit_download))
        .route("/conversions", post(routes::submit_conversion))
        // Artifacts
        .route("/artifacts/:name", get(routes::get_artifact))
        // System
        .route("/progress", get(routes::progress_stream))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address
///
/// Runs until the fetcher is shut down or the listener fails.
///
/// # Example
///
/// ```no_run
/// use audio_fetch::{AudioFetcher, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Arc::new(AudioFetcher::new(Config::from_json_file("appsettings.json")?).await?);
///
/// audio_fetch::api::start_api_server(fetcher.clone(), fetcher.get_config()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(fetcher: Arc<AudioFetcher>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let shutdown = fetcher.shutdown_token();
    let app = create_router(fetcher, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
