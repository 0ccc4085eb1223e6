//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the audio-fetch REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the audio-fetch REST API
///
/// Served as JSON at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "audio-fetch REST API",
        version = "0.1.0",
        description = "Download remote media, convert it to audio, and stream progress while jobs run",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::submit_download,
        crate::api::routes::submit_conversion,

        // Artifacts
        crate::api::routes::get_artifact,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::progress_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::Stage,
        crate::types::ProgressEvent,
        crate::types::NamingPair,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::ToolsConfig,
        crate::config::ProgressConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::SubmitUrlRequest,
        crate::api::routes::ConvertRequest,
        crate::api::routes::AudioJobResponse,
        crate::api::routes::DownloadResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Jobs - Download media, convert it to audio, or both"),
        (name = "artifacts", description = "Artifacts - Retrieve produced audio files"),
        (name = "system", description = "System endpoints - Health checks, progress stream, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
