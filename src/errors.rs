use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{
    query::QueryError,
    services::{bootcamp_service::BootcampError, geocoder::GeocodeError},
};

/// Message + status pair every handler failure is reduced to.
///
/// The `IntoResponse` impl is the one place error bodies are formatted:
/// `{ "success": false, "error": "<message>" }`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn bootcamp_not_found(id: impl fmt::Display) -> Self {
        Self::not_found(format!("Bootcamp not found with id of {}", id))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<BootcampError> for AppError {
    fn from(err: BootcampError) -> Self {
        match err {
            BootcampError::NotFound(id) => AppError::bootcamp_not_found(id),
            BootcampError::Validation(msg) => AppError::bad_request(msg),
            BootcampError::Duplicate => AppError::bad_request("Duplicate field value entered"),
            other => {
                tracing::error!("bootcamp repository error: {}", other);
                AppError::internal("Server Error")
            }
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<GeocodeError> for AppError {
    fn from(err: GeocodeError) -> Self {
        tracing::error!("geocoder error: {}", err);
        AppError::new(StatusCode::BAD_GATEWAY, "Geocoding service unavailable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn repository_errors_map_to_statuses() {
        let id = Uuid::new_v4();
        let err = AppError::from(BootcampError::NotFound(id));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.message.contains(&id.to_string()));

        let err = AppError::from(BootcampError::Duplicate);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = AppError::from(BootcampError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Server Error");
    }

    #[test]
    fn query_errors_are_bad_requests() {
        let err = AppError::from(QueryError::UnknownField("password".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Unknown field `password`");
    }
}
