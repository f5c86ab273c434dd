//! Wire types shared by the chaptrack server and its clients.
//!
//! Field names follow the public JSON contract (camelCase), so every struct
//! here is safe to cache verbatim and replay to a caller.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be one of: {} (got `{}`)",
            self.kind,
            self.allowed.join(", "),
            self.value
        )
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "chapter_subject"))]
pub enum Subject {
    Physics,
    Chemistry,
    Mathematics,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Physics, Subject::Chemistry, Subject::Mathematics];
    const NAMES: &'static [&'static str] = &["Physics", "Chemistry", "Mathematics"];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Mathematics => "Mathematics",
        }
    }
}

impl FromStr for Subject {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "subject",
                value: value.to_string(),
                allowed: Self::NAMES,
            })
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// School year a chapter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "chapter_class"))]
pub enum ClassLevel {
    #[serde(rename = "Class 11")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Class 11"))]
    Class11,
    #[serde(rename = "Class 12")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Class 12"))]
    Class12,
}

impl ClassLevel {
    pub const ALL: [ClassLevel; 2] = [ClassLevel::Class11, ClassLevel::Class12];
    const NAMES: &'static [&'static str] = &["Class 11", "Class 12"];

    pub fn as_str(self) -> &'static str {
        match self {
            ClassLevel::Class11 => "Class 11",
            ClassLevel::Class12 => "Class 12",
        }
    }
}

impl FromStr for ClassLevel {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ClassLevel::ALL
            .into_iter()
            .find(|class| class.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "class",
                value: value.to_string(),
                allowed: Self::NAMES,
            })
    }
}

impl fmt::Display for ClassLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Study progress of a chapter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "chapter_status"))]
pub enum ChapterStatus {
    #[default]
    #[serde(rename = "Not Started")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Not Started"))]
    NotStarted,
    #[serde(rename = "In Progress")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "In Progress"))]
    InProgress,
    #[serde(rename = "Completed")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Completed"))]
    Completed,
}

impl ChapterStatus {
    pub const ALL: [ChapterStatus; 3] = [
        ChapterStatus::NotStarted,
        ChapterStatus::InProgress,
        ChapterStatus::Completed,
    ];
    const NAMES: &'static [&'static str] = &["Not Started", "In Progress", "Completed"];

    pub fn as_str(self) -> &'static str {
        match self {
            ChapterStatus::NotStarted => "Not Started",
            ChapterStatus::InProgress => "In Progress",
            ChapterStatus::Completed => "Completed",
        }
    }
}

impl FromStr for ChapterStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ChapterStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: value.to_string(),
                allowed: Self::NAMES,
            })
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chapter as returned by the API, including derived progress fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterResponse {
    pub id: Uuid,
    pub subject: Subject,
    pub chapter: String,
    pub class: ClassLevel,
    pub unit: String,
    pub year_wise_question_count: BTreeMap<String, u32>,
    pub question_solved: u32,
    pub status: ChapterStatus,
    pub is_weak_chapter: bool,
    pub total_questions: u64,
    pub completion_percentage: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_chapters: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: u32,
}

/// One page of a filtered chapter listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterPage {
    pub chapters: Vec<ChapterResponse>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCounts {
    pub total_chapters: u64,
    pub completed_chapters: u64,
    pub in_progress_chapters: u64,
    pub not_started_chapters: u64,
    pub weak_chapters: u64,
    pub completion_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDistribution {
    pub subject: Subject,
    pub count: u64,
    pub completed: u64,
    pub weak_chapters: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub overview: OverviewCounts,
    pub subject_distribution: Vec<SubjectDistribution>,
}

/// Distinct values currently present in the collection, for filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub subjects: Vec<Subject>,
    pub classes: Vec<ClassLevel>,
    pub units: Vec<String>,
    pub statuses: Vec<ChapterStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkCreated {
    pub index: usize,
    pub chapter: ChapterResponse,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub index: usize,
    pub chapter: serde_json::Value,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkCreateReport {
    pub successful: Vec<BulkCreated>,
    pub failed: Vec<BulkFailure>,
}

impl BulkCreateReport {
    /// A batch succeeds when at least one record was stored.
    pub fn is_success(&self) -> bool {
        !self.successful.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldErrorBody {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Response envelope used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldErrorBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            details: None,
            retry_after: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiEnvelope<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
            details: None,
            retry_after: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            details: None,
            retry_after: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}
