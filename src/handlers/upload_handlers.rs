use crate::{errors::AppError, services::upload_store::content_type_for, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// `GET /uploads/{filename}` — stream a stored photo back.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let file = state
        .uploads
        .open(&filename)
        .await
        .map_err(|e| {
            tracing::error!("failed to open upload {}: {}", filename, e);
            AppError::internal("Server Error")
        })?
        .ok_or_else(|| AppError::not_found("File not found"))?;

    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&filename)),
    );
    Ok(response)
}
