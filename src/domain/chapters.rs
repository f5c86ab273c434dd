//! Chapter payload validation.
//!
//! Incoming chapters arrive as loosely typed JSON (request bodies, uploaded
//! files, seed archives). [`ChapterDraft::from_json`] checks every field and
//! reports all problems at once instead of stopping at the first.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::error::{FieldError, ValidationErrors};
use crate::domain::types::{ChapterStatus, ClassLevel, Subject, parse_bool_flag};

pub const CHAPTER_NAME_MAX_CHARS: usize = 200;
pub const UNIT_MAX_CHARS: usize = 100;

/// A validated chapter ready to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterDraft {
    pub subject: Subject,
    pub chapter: String,
    pub class: ClassLevel,
    pub unit: String,
    pub year_wise_question_count: BTreeMap<String, u32>,
    pub question_solved: u32,
    pub status: ChapterStatus,
    pub is_weak_chapter: bool,
}

impl ChapterDraft {
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let Some(object) = value.as_object() else {
            return Err(FieldError::new("chapter", "Chapter must be a JSON object")
                .with_value(value)
                .into());
        };

        let mut errors = ValidationErrors::default();

        let subject = required_enum::<Subject>(
            object.get("subject"),
            "subject",
            "Subject is required",
            "Subject must be Physics, Chemistry, or Mathematics",
            &mut errors,
        );
        let chapter = bounded_text(
            object.get("chapter"),
            "chapter",
            "Chapter name is required",
            "Chapter name must be between 1 and 200 characters",
            CHAPTER_NAME_MAX_CHARS,
            &mut errors,
        );
        let class = required_enum::<ClassLevel>(
            object.get("class"),
            "class",
            "Class is required",
            "Class must be Class 11 or Class 12",
            &mut errors,
        );
        let unit = bounded_text(
            object.get("unit"),
            "unit",
            "Unit is required",
            "Unit must be between 1 and 100 characters",
            UNIT_MAX_CHARS,
            &mut errors,
        );
        let year_wise_question_count =
            year_counts(object.get("yearWiseQuestionCount"), &mut errors);
        let question_solved = optional_count(
            object.get("questionSolved"),
            "questionSolved",
            "Questions solved must be a non-negative integer",
            &mut errors,
        );
        let status = optional_enum::<ChapterStatus>(
            object.get("status"),
            "status",
            "Status must be Not Started, In Progress, or Completed",
            &mut errors,
        );
        let is_weak_chapter = optional_flag(object.get("isWeakChapter"), &mut errors);

        match (subject, chapter, class, unit) {
            (Some(subject), Some(chapter), Some(class), Some(unit)) if errors.is_empty() => {
                Ok(Self {
                    subject,
                    chapter,
                    class,
                    unit,
                    year_wise_question_count,
                    question_solved: question_solved.unwrap_or(0),
                    status: status.unwrap_or_default(),
                    is_weak_chapter: is_weak_chapter.unwrap_or(false),
                })
            }
            _ => Err(errors),
        }
    }

    pub fn total_questions(&self) -> u64 {
        self.year_wise_question_count
            .values()
            .map(|count| u64::from(*count))
            .sum()
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn required_enum<T: std::str::FromStr>(
    value: Option<&Value>,
    field: &'static str,
    missing: &'static str,
    invalid: &'static str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    if is_absent(value) {
        errors.push(FieldError::new(field, missing));
        return None;
    }
    optional_enum(value, field, invalid, errors)
}

fn optional_enum<T: std::str::FromStr>(
    value: Option<&Value>,
    field: &'static str,
    invalid: &'static str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    let raw = value.filter(|value| !value.is_null())?;
    match raw.as_str().map(str::trim).map(str::parse::<T>) {
        Some(Ok(parsed)) => Some(parsed),
        _ => {
            errors.push(FieldError::new(field, invalid).with_value(raw));
            None
        }
    }
}

fn bounded_text(
    value: Option<&Value>,
    field: &'static str,
    missing: &'static str,
    invalid: &'static str,
    max_chars: usize,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let Some(raw) = value.filter(|value| !value.is_null()) else {
        errors.push(FieldError::new(field, missing));
        return None;
    };
    let Some(text) = raw.as_str() else {
        errors.push(FieldError::new(field, invalid).with_value(raw));
        return None;
    };
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    if chars == 0 || chars > max_chars {
        errors.push(FieldError::new(field, invalid).with_value(raw));
        return None;
    }
    Some(trimmed.to_string())
}

/// Non-negative integer, given as a JSON number or as a string of digits.
fn as_count(value: &Value) -> Option<u32> {
    let count = match value {
        Value::Number(number) => number.as_u64()?,
        Value::String(text) => {
            let digits = text.trim();
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse::<u64>().ok()?
        }
        _ => return None,
    };
    u32::try_from(count).ok()
}

fn optional_count(
    value: Option<&Value>,
    field: &'static str,
    invalid: &'static str,
    errors: &mut ValidationErrors,
) -> Option<u32> {
    let raw = value.filter(|value| !value.is_null())?;
    match as_count(raw) {
        Some(count) => Some(count),
        None => {
            errors.push(FieldError::new(field, invalid).with_value(raw));
            None
        }
    }
}

fn optional_flag(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<bool> {
    let raw = value.filter(|value| !value.is_null())?;
    let parsed = match raw {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => parse_bool_flag(text),
        _ => None,
    };
    if parsed.is_none() {
        errors.push(
            FieldError::new("isWeakChapter", "isWeakChapter must be a boolean").with_value(raw),
        );
    }
    parsed
}

fn year_counts(value: Option<&Value>, errors: &mut ValidationErrors) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    let Some(raw) = value.filter(|value| !value.is_null()) else {
        return counts;
    };
    let Some(entries) = raw.as_object() else {
        errors.push(
            FieldError::new(
                "yearWiseQuestionCount",
                "yearWiseQuestionCount must be an object",
            )
            .with_value(raw),
        );
        return counts;
    };

    for (year, count) in entries {
        match as_count(count) {
            Some(count) => {
                counts.insert(year.clone(), count);
            }
            None => {
                let message = if count.as_i64().is_some_and(|n| n < 0) {
                    "Question count cannot be negative"
                } else {
                    "Question counts must be non-negative integers"
                };
                errors.push(FieldError::new("yearWiseQuestionCount", message).with_value(raw));
                break;
            }
        }
    }
    counts
}
