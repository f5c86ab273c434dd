use std::borrow::Cow;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chaptrack_api_types::{ApiEnvelope, FieldErrorBody};

use crate::application::chapters::ChapterServiceError;
use crate::application::error::ErrorReport;
use crate::application::pagination::PaginationError;
use crate::application::repos::RepoError;
use crate::domain::error::{FieldError, ValidationErrors};

const SOURCE: &str = "infra::http::api";

pub mod messages {
    pub const VALIDATION_FAILED: &str = "Validation failed";
    pub const NOT_FOUND: &str = "Chapter not found";
    pub const ROUTE_NOT_FOUND: &str = "Route not found";
    pub const INVALID_ID: &str = "Invalid chapter ID format";
    pub const STORE_FAILED: &str = "Database operation failed";
    pub const NO_TOKEN: &str =
        "Access denied. No token provided. Use Bearer token in Authorization header.";
    pub const INVALID_TOKEN: &str = "Access denied. Invalid admin token.";
    pub const RATE_LIMITED: &str = "Too many requests from this IP, please try again later.";
    pub const PAYLOAD_TOO_LARGE: &str = "Request payload exceeds the size limit";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: Cow<'static, str>,
    details: Option<Vec<FieldErrorBody>>,
    retry_after: Option<u64>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
            retry_after: None,
            report: None,
        }
    }

    pub fn bad_request(error: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, messages::NOT_FOUND)
    }

    pub fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, messages::ROUTE_NOT_FOUND)
    }

    pub fn invalid_id(raw: &str) -> Self {
        let error = FieldError::new("id", messages::INVALID_ID)
            .with_value(&serde_json::Value::String(raw.to_string()));
        Self::validation(&error.into())
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, messages::NO_TOKEN)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, messages::INVALID_TOKEN)
    }

    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, messages::PAYLOAD_TOO_LARGE)
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        let mut error = Self::new(StatusCode::TOO_MANY_REQUESTS, messages::RATE_LIMITED);
        error.retry_after = Some(retry_after);
        error.report = Some(ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        ));
        error
    }

    pub fn validation(errors: &ValidationErrors) -> Self {
        let mut error = Self::bad_request(messages::VALIDATION_FAILED);
        error.details = Some(errors.errors().iter().map(field_body).collect());
        error
    }

    /// Store failure. The client sees a generic message; the chain goes to the log.
    pub fn store(err: &RepoError) -> Self {
        let mut error = Self::new(StatusCode::INTERNAL_SERVER_ERROR, messages::STORE_FAILED);
        error.report = Some(ErrorReport::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            err,
        ));
        error
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn field_body(error: &FieldError) -> FieldErrorBody {
    FieldErrorBody {
        field: error.field.to_string(),
        message: error.message.clone(),
        value: error.value.clone(),
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(&errors)
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        let field = match err {
            PaginationError::InvalidPage => "page",
            PaginationError::InvalidLimit => "limit",
        };
        Self::validation(&FieldError::new(field, err.to_string()).into())
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        if err.is_record_level() {
            let mut error = Self::bad_request(err.to_string());
            error.report = Some(ErrorReport::from_error(SOURCE, StatusCode::BAD_REQUEST, &err));
            return error;
        }
        Self::store(&err)
    }
}

impl From<ChapterServiceError> for ApiError {
    fn from(err: ChapterServiceError) -> Self {
        match err {
            ChapterServiceError::Validation(errors) => Self::validation(&errors),
            ChapterServiceError::EmptyBatch => Self::bad_request(err.to_string()),
            ChapterServiceError::Repo(repo) => repo.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = ApiEnvelope::failure(self.error.clone());
        body.details = self.details;
        body.retry_after = self.retry_after;

        let mut response = (self.status, Json(body)).into_response();
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        // Attach a structured report so shared logging middleware can emit rich diagnostics.
        let report = self
            .report
            .unwrap_or_else(|| ErrorReport::from_message(SOURCE, self.status, self.error));
        report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn store_errors_hide_the_cause() {
        let response =
            ApiError::from(RepoError::Persistence("connection reset".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().cloned();
        assert!(
            report
                .expect("report attached")
                .messages
                .iter()
                .any(|m| m.contains("connection reset"))
        );

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], messages::STORE_FAILED);
    }

    #[tokio::test]
    async fn rate_limited_sets_header_and_field() {
        let response = ApiError::rate_limited(42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from_static("42"))
        );
        let body = body_json(response).await;
        assert_eq!(body["retryAfter"], 42);
    }

    #[tokio::test]
    async fn pagination_errors_become_validation_details() {
        let response = ApiError::from(PaginationError::InvalidLimit).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], messages::VALIDATION_FAILED);
        assert_eq!(body["details"][0]["field"], "limit");
        assert_eq!(
            body["details"][0]["message"],
            "Limit must be between 1 and 100"
        );
    }
}
