//! Artifact handler: serve produced audio files.

use crate::api::AppState;
use crate::error::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /artifacts/:name - Fetch a produced audio file
#[utoipa::path(
    get,
    path = "/artifacts/{name}",
    tag = "artifacts",
    params(
        ("name" = String, Path, description = "File name inside the download directory")
    ),
    responses(
        (status = 200, description = "Audio file contents", content_type = "audio/mpeg"),
        (status = 400, description = "Name is not a plain file name", body = crate::error::ApiError),
        (status = 404, description = "No produced audio file with that name", body = crate::error::ApiError)
    )
)]
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let artifact = state.fetcher.open_artifact(&name).await?;

    // header values must be visible ASCII
    let ascii_name: String = artifact
        .file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"') || c == ' ' { c } else { '_' })
        .collect();
    let disposition = format!("attachment; filename=\"{ascii_name}\"");

    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_LENGTH, artifact.len.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(artifact.file)),
    )
        .into_response())
}
