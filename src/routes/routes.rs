//! Defines routes for the bootcamp directory API.
//!
//! ## Structure
//! - **Bootcamp endpoints** (nested under `/api/v1/bootcamps`)
//!   - `GET    /` — list (filter, select, sort, page, limit)
//!   - `POST   /` — create
//!   - `GET    /{id}` — fetch one
//!   - `PUT    /{id}` — partial update
//!   - `DELETE /{id}` — delete (courses cascade)
//!   - `GET    /radius/{zipcode}/{distance}` — bootcamps within distance of a zipcode
//!   - `PUT    /{id}/photo` — multipart photo upload
//!
//! - **Static & probes**
//!   - `GET /uploads/{filename}` — stored photos
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        bootcamp_handlers::{
            bootcamps_in_radius, create_bootcamp, delete_bootcamp, get_bootcamp, list_bootcamps,
            update_bootcamp, upload_bootcamp_photo,
        },
        health_handlers::{healthz, readyz},
        upload_handlers::serve_upload,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, put},
};

/// Headroom over the photo limit for multipart boundaries and headers, so
/// oversized photos reach the handler and get the descriptive error.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Bootcamp routes, relative to their mount point.
pub fn bootcamp_routes(max_upload: u64) -> Router<AppState> {
    let photo_limit = usize::try_from(max_upload.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(list_bootcamps).post(create_bootcamp))
        .route("/radius/{zipcode}/{distance}", get(bootcamps_in_radius))
        .route(
            "/{id}",
            get(get_bootcamp).put(update_bootcamp).delete(delete_bootcamp),
        )
        .route(
            "/{id}/photo",
            put(upload_bootcamp_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
}

/// Build the full application router with shared state attached.
pub fn app(state: AppState) -> Router {
    let max_upload = state.uploads.max_bytes();

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/uploads/{filename}", get(serve_upload))
        .nest("/api/v1/bootcamps", bootcamp_routes(max_upload))
        .with_state(state)
}
