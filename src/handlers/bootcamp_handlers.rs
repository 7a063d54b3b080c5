//! HTTP handlers for the bootcamp resource.
//!
//! Each handler translates the request into repository, geocoder or upload
//! store calls and wraps the outcome in [`ApiResponse`]. Failures are
//! returned as [`AppError`] and rendered in one place.

use crate::{
    errors::AppError,
    models::{
        bootcamp::{Bootcamp, CreateBootcamp, Location, UpdateBootcamp},
        geo::{SphericalCap, radius_from_distance},
        response::ApiResponse,
    },
    query::ListQuery,
    services::upload_store::{is_image, photo_filename},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

/// `GET /api/v1/bootcamps`
///
/// Filter, select, sort and paginate. `pagination` is computed against the
/// total number of bootcamps, not the filtered count.
pub async fn list_bootcamps(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let query = ListQuery::from_pairs(&params)?;

    let total = state.bootcamps.count_all().await?;
    let bootcamps = state.bootcamps.list(&query).await?;
    let pagination = query.window.pagination(total);

    let data = bootcamps
        .iter()
        .map(|bootcamp| -> Result<Value, serde_json::Error> {
            let value = serde_json::to_value(bootcamp)?;
            Ok(match &query.projection {
                Some(projection) => projection.apply(value),
                None => value,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| AppError::internal(err.to_string()))?;

    let count = data.len();
    Ok(Json(
        ApiResponse::data(data)
            .with_msg("Show all bootcamps")
            .with_count(count)
            .with_pagination(pagination),
    ))
}

/// `GET /api/v1/bootcamps/{id}`
pub async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Bootcamp>>, AppError> {
    let id = parse_id(&id)?;
    let bootcamp = state.bootcamps.get(id).await?;
    Ok(Json(ApiResponse::data(bootcamp)))
}

/// `POST /api/v1/bootcamps`
pub async fn create_bootcamp(
    State(state): State<AppState>,
    payload: Result<Json<CreateBootcamp>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Bootcamp>>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let location = geocode_address(&state, payload.address.as_deref()).await?;
    let bootcamp = state.bootcamps.create(payload, location).await?;

    tracing::info!("created bootcamp {} ({})", bootcamp.id, bootcamp.name);
    Ok((StatusCode::CREATED, Json(ApiResponse::data(bootcamp))))
}

/// `PUT /api/v1/bootcamps/{id}` — partial update, validators applied,
/// updated document returned.
pub async fn update_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBootcamp>, JsonRejection>,
) -> Result<Json<ApiResponse<Bootcamp>>, AppError> {
    let id = parse_id(&id)?;
    let Json(changes) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let location = geocode_address(&state, changes.address.as_deref()).await?;
    let bootcamp = state.bootcamps.update(id, changes, location).await?;
    Ok(Json(ApiResponse::data(bootcamp)))
}

/// `DELETE /api/v1/bootcamps/{id}`
pub async fn delete_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let id = parse_id(&id)?;
    state.bootcamps.delete(id).await?;

    tracing::info!("deleted bootcamp {}", id);
    Ok(Json(ApiResponse::data(json!({}))))
}

/// `GET /api/v1/bootcamps/radius/{zipcode}/{distance}`
///
/// `distance` must use the unit of [`crate::models::geo::EARTH_RADIUS`].
/// Returns `count` + `data` only; this route is not paginated.
pub async fn bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<Bootcamp>>>, AppError> {
    let distance = distance
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| AppError::bad_request(format!("Invalid distance `{}`", distance)))?;

    let center = state
        .geocoder
        .geocode(&zipcode)
        .await?
        .first()
        .map(|result| result.point())
        .ok_or_else(|| AppError::not_found(format!("No location found for zipcode {}", zipcode)))?;

    let cap = SphericalCap::new(center, radius_from_distance(distance));
    let bootcamps = state.bootcamps.within_radius(cap).await?;

    let count = bootcamps.len();
    Ok(Json(ApiResponse::data(bootcamps).with_count(count)))
}

/// `PUT /api/v1/bootcamps/{id}/photo`
///
/// Accepts one `file` part. It must be an `image/*` no larger than the
/// configured maximum. Stored as `BOOTCAMP_<id>_<YYYYMMDD><ext>`.
pub async fn upload_bootcamp_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let id = parse_id(&id)?;
    let bootcamp = state.bootcamps.get(id).await?;

    let max = state.uploads.max_bytes();
    let file = match multipart {
        Ok(mut multipart) => read_file_part(&mut multipart, max).await?,
        Err(_) => None,
    }
    .ok_or_else(|| AppError::bad_request("Please upload a file"))?;

    if !is_image(&file.content_type) {
        return Err(AppError::bad_request("Please upload an image file"));
    }

    if file.data.len() as u64 > max {
        return Err(too_large(max));
    }

    let filename = photo_filename(bootcamp.id, Utc::now().date_naive(), &file.file_name);
    if let Err(err) = state.uploads.save(&filename, &file.data).await {
        tracing::error!("failed to store photo {} for {}: {}", filename, bootcamp.id, err);
        return Err(AppError::internal("Problem with file upload"));
    }

    state.bootcamps.set_photo(bootcamp.id, &filename).await?;
    tracing::info!("stored photo {} for bootcamp {}", filename, bootcamp.id);

    Ok(Json(ApiResponse::data(filename)))
}

/// Non-UUID ids can never match, so they are reported as not found.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bootcamp_not_found(raw))
}

/// Resolve an address to a location; `None` when no address was supplied.
async fn geocode_address(
    state: &AppState,
    address: Option<&str>,
) -> Result<Option<Location>, AppError> {
    let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };

    let result = state
        .geocoder
        .geocode(address)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::bad_request(format!("Unable to geocode address `{}`", address)))?;

    Ok(Some(result.into_location()))
}

struct UploadedFile {
    file_name: String,
    content_type: String,
    data: Bytes,
}

fn too_large(max: u64) -> AppError {
    AppError::bad_request(format!("Please upload an image less than {} bytes", max))
}

/// A body cut off by the route's size limit is reported as an oversized photo.
fn multipart_error(err: MultipartError, max: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(max);
    }
    tracing::debug!("Failed to read multipart data: {}", err);
    AppError::bad_request(format!("Failed to read multipart data: {}", err))
}

/// First non-empty `file` part, if any.
async fn read_file_part(
    multipart: &mut Multipart,
    max: u64,
) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| multipart_error(e, max))?;

        if file_name.is_empty() && data.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            data,
        }));
    }
    Ok(None)
}
