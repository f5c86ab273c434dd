//! Chapter handlers

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{FromRequest, Multipart, Path, Query, State};
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chaptrack_api_types::{ApiEnvelope, BulkCreateReport};
use serde_json::Value;

use crate::application::error::ErrorReport;

use super::{ChapterListQuery, json_payload, parse_chapter_id};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

/// Multipart field carrying an uploaded chapters file.
pub const UPLOAD_FIELD: &str = "chapters";

const MISSING_CHAPTERS: &str =
    "Please provide chapters data as JSON array in request body or upload a JSON file";
const NOT_AN_ARRAY: &str = "Chapters data must be an array";
const INVALID_FILE: &str = "Invalid JSON file format";
const ONLY_JSON_FILES: &str = "Only JSON files are allowed";
const INVALID_MULTIPART: &str = "Invalid multipart payload";
const DELETED: &str = "Chapter deleted successfully";

pub async fn list_chapters(
    State(state): State<ApiState>,
    Query(query): Query<ChapterListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, page) = query.parse()?;
    let result = state.chapters.list(&filter, page).await?;
    Ok(Json(ApiEnvelope::ok(result)))
}

pub async fn get_chapter(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_chapter_id(&id)?;
    match state.chapters.get(id).await? {
        Some(chapter) => Ok(Json(ApiEnvelope::ok(chapter))),
        None => Err(ApiError::not_found()),
    }
}

pub async fn create_chapter(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_payload(payload)?;
    let chapter = state.chapters.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(ApiEnvelope::ok(chapter))))
}

pub async fn update_chapter(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_chapter_id(&id)?;
    let payload = json_payload(payload)?;
    match state.chapters.update(id, &payload).await? {
        Some(chapter) => Ok(Json(ApiEnvelope::ok(chapter))),
        None => Err(ApiError::not_found()),
    }
}

pub async fn delete_chapter(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_chapter_id(&id)?;
    if state.chapters.delete(id).await? {
        Ok(Json(ApiEnvelope::message_only(DELETED)))
    } else {
        Err(ApiError::not_found())
    }
}

/// Bulk upload from either a JSON array body or a multipart JSON file.
pub async fn upload_chapters(
    State(state): State<ApiState>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let records = read_bulk_records(&state, request).await?;
    let report = state.chapters.bulk_create(records).await?;

    let status = bulk_status(&report);
    let message = format!(
        "{} chapters created successfully, {} failed",
        report.successful.len(),
        report.failed.len()
    );
    let success = report.is_success();
    let body = ApiEnvelope::ok(report)
        .with_success(success)
        .with_message(message.clone());

    let mut response = (status, Json(body)).into_response();
    if !success {
        ErrorReport::from_message("infra::http::api::chapters", status, message)
            .attach(&mut response);
    }
    Ok(response)
}

fn bulk_status(report: &BulkCreateReport) -> StatusCode {
    match (report.successful.is_empty(), report.failed.is_empty()) {
        (true, _) => StatusCode::BAD_REQUEST,
        (false, true) => StatusCode::CREATED,
        (false, false) => StatusCode::MULTI_STATUS,
    }
}

async fn read_bulk_records(
    state: &ApiState,
    request: Request<Body>,
) -> Result<Vec<Value>, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|_| ApiError::bad_request(INVALID_MULTIPART))?;
        return records_from_multipart(multipart).await;
    }

    let body = Bytes::from_request(request, state)
        .await
        .map_err(body_error)?;
    match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Array(records)) => Ok(records),
        _ => Err(ApiError::bad_request(MISSING_CHAPTERS)),
    }
}

async fn records_from_multipart(mut multipart: Multipart) -> Result<Vec<Value>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        if !is_json_media_type(field.content_type()) {
            return Err(ApiError::bad_request(ONLY_JSON_FILES));
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        return match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(_) => Err(ApiError::bad_request(NOT_AN_ARRAY)),
            Err(_) => Err(ApiError::bad_request(INVALID_FILE)),
        };
    }

    Err(ApiError::bad_request(MISSING_CHAPTERS))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large()
    } else {
        ApiError::bad_request(INVALID_MULTIPART)
    }
}

fn body_error(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large()
    } else {
        ApiError::bad_request(MISSING_CHAPTERS)
    }
}

fn is_json_media_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
}
