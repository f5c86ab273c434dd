//! API handlers organized by resource.
//!
//! Query parsing and id extraction are shared here so every route reports
//! malformed input the same way.

mod analytics;
mod chapters;
mod system;

pub use analytics::*;
pub use chapters::*;
pub use system::*;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::application::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT, PageRequest};
use crate::application::repos::ChapterQueryFilter;
use crate::domain::chapters::UNIT_MAX_CHARS;
use crate::domain::error::{FieldError, ValidationErrors};
use crate::domain::types::{ChapterStatus, ClassLevel, Subject, parse_bool_flag};

use super::error::ApiError;

const INVALID_JSON_BODY: &str = "Request body must be valid JSON";

/// Raw list query. Values stay strings so every problem can be reported at once.
#[derive(Debug, Default, Deserialize)]
pub struct ChapterListQuery {
    pub subject: Option<String>,
    pub class: Option<String>,
    pub unit: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "weakChapters")]
    pub weak_chapters: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ChapterListQuery {
    pub fn parse(self) -> Result<(ChapterQueryFilter, PageRequest), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut filter = ChapterQueryFilter::default();

        let page = match self.page.as_deref() {
            None => DEFAULT_PAGE,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|page| *page >= 1)
                .unwrap_or_else(|| {
                    errors.push(reject("page", "Page must be a positive integer", raw));
                    DEFAULT_PAGE
                }),
        };

        let limit = match self.limit.as_deref() {
            None => DEFAULT_LIMIT,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|limit| (1..=MAX_LIMIT).contains(limit))
                .unwrap_or_else(|| {
                    errors.push(reject("limit", "Limit must be between 1 and 100", raw));
                    DEFAULT_LIMIT
                }),
        };

        if let Some(raw) = self.subject.as_deref() {
            match raw.parse::<Subject>() {
                Ok(subject) => filter.subject = Some(subject),
                Err(_) => errors.push(reject(
                    "subject",
                    "Subject must be Physics, Chemistry, or Mathematics",
                    raw,
                )),
            }
        }

        if let Some(raw) = self.class.as_deref() {
            match raw.parse::<ClassLevel>() {
                Ok(class) => filter.class = Some(class),
                Err(_) => errors.push(reject("class", "Class must be Class 11 or Class 12", raw)),
            }
        }

        if let Some(raw) = self.status.as_deref() {
            match raw.parse::<ChapterStatus>() {
                Ok(status) => filter.status = Some(status),
                Err(_) => errors.push(reject(
                    "status",
                    "Status must be Not Started, In Progress, or Completed",
                    raw,
                )),
            }
        }

        if let Some(raw) = self.weak_chapters.as_deref() {
            match parse_bool_flag(raw) {
                Some(weak) => filter.weak = Some(weak),
                None => errors.push(reject(
                    "weakChapters",
                    "weakChapters must be true or false",
                    raw,
                )),
            }
        }

        if let Some(raw) = self.unit.as_deref() {
            let unit = raw.trim();
            let chars = unit.chars().count();
            if chars == 0 || chars > UNIT_MAX_CHARS {
                errors.push(reject(
                    "unit",
                    "Unit must be between 1 and 100 characters",
                    raw,
                ));
            } else {
                filter.unit = Some(unit.to_string());
            }
        }

        // rejected values already fell back to the defaults above
        let page = PageRequest::new(page, limit).unwrap_or_default();
        errors.into_result((filter, page))
    }
}

fn reject(field: &'static str, message: &str, raw: &str) -> FieldError {
    FieldError::new(field, message).with_value(&Value::String(raw.to_string()))
}

pub(crate) fn parse_chapter_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::invalid_id(raw))
}

pub(crate) fn json_payload(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::BytesRejection(_)) => Err(ApiError::payload_too_large()),
        Err(_) => Err(ApiError::bad_request(INVALID_JSON_BODY)),
    }
}
