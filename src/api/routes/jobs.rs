//! Job handlers: full pipeline, download-only, convert-only.
//!
//! Each request runs its job to completion before responding; progress is
//! observed separately through `GET /progress`.

use super::{AudioJobResponse, ConvertRequest, DownloadResponse, SubmitUrlRequest};
use crate::api::AppState;
use crate::error::{Error, Result};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

/// POST /jobs - Download a URL and convert it to audio
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = SubmitUrlRequest,
    responses(
        (status = 200, description = "Audio file produced", body = AudioJobResponse),
        (status = 400, description = "Invalid request or URL", body = crate::error::ApiError),
        (status = 409, description = "Audio file already exists", body = crate::error::ApiError),
        (status = 422, description = "Media metadata could not be read", body = crate::error::ApiError),
        (status = 502, description = "Downloader or transcoder failed", body = crate::error::ApiError),
        (status = 503, description = "Job cancelled or server shutting down", body = crate::error::ApiError),
        (status = 504, description = "Job timed out", body = crate::error::ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitUrlRequest>, JsonRejection>,
) -> Result<Json<AudioJobResponse>> {
    let Json(request) = payload.map_err(invalid_body)?;
    let audio = state.fetcher.process(&request.url).await?;
    Ok(Json(audio.into()))
}

/// POST /downloads - Download a URL without converting it
#[utoipa::path(
    post,
    path = "/downloads",
    tag = "jobs",
    request_body = SubmitUrlRequest,
    responses(
        (status = 200, description = "Media downloaded", body = DownloadResponse),
        (status = 400, description = "Invalid request or URL", body = crate::error::ApiError),
        (status = 422, description = "Media metadata could not be read", body = crate::error::ApiError),
        (status = 502, description = "Downloader failed", body = crate::error::ApiError)
    )
)]
pub async fn submit_download(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitUrlRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>> {
    let Json(request) = payload.map_err(invalid_body)?;
    let media = state.fetcher.download(&request.url).await?;
    Ok(Json(media.into()))
}

/// POST /conversions - Convert a previously downloaded file
#[utoipa::path(
    post,
    path = "/conversions",
    tag = "jobs",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Audio file produced", body = AudioJobResponse),
        (status = 400, description = "Path missing or outside the download directory", body = crate::error::ApiError),
        (status = 409, description = "Audio file already exists", body = crate::error::ApiError),
        (status = 502, description = "Transcoder failed", body = crate::error::ApiError)
    )
)]
pub async fn submit_conversion(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<AudioJobResponse>> {
    let Json(request) = payload.map_err(invalid_body)?;
    let audio = state.fetcher.convert(&request.path).await?;
    Ok(Json(audio.into()))
}

fn invalid_body(rejection: JsonRejection) -> Error {
    Error::Validation(format!("invalid request body: {}", rejection.body_text()))
}
