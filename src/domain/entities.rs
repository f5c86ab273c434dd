//! Domain entities mirrored from persistent storage.

use std::collections::BTreeMap;

use chaptrack_api_types::ChapterResponse;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ChapterStatus, ClassLevel, Subject};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterRecord {
    pub id: Uuid,
    pub subject: Subject,
    pub chapter: String,
    pub class: ClassLevel,
    pub unit: String,
    pub year_wise_question_count: BTreeMap<String, u32>,
    pub question_solved: u32,
    pub status: ChapterStatus,
    pub is_weak_chapter: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ChapterRecord {
    /// Sum of the per-year question counts.
    pub fn total_questions(&self) -> u64 {
        self.year_wise_question_count
            .values()
            .map(|count| u64::from(*count))
            .sum()
    }

    /// Solved questions as a rounded percentage of the total; 0 when there are no questions.
    pub fn completion_percentage(&self) -> u32 {
        rounded_percentage(u64::from(self.question_solved), self.total_questions())
    }
}

impl From<&ChapterRecord> for ChapterResponse {
    fn from(record: &ChapterRecord) -> Self {
        Self {
            id: record.id,
            subject: record.subject,
            chapter: record.chapter.clone(),
            class: record.class,
            unit: record.unit.clone(),
            year_wise_question_count: record.year_wise_question_count.clone(),
            question_solved: record.question_solved,
            status: record.status,
            is_weak_chapter: record.is_weak_chapter,
            total_questions: record.total_questions(),
            completion_percentage: record.completion_percentage(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<ChapterRecord> for ChapterResponse {
    fn from(record: ChapterRecord) -> Self {
        ChapterResponse::from(&record)
    }
}

/// `round(part / whole * 100)` with halves rounded up, 0 when `whole` is 0.
pub fn rounded_percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let scaled = (u128::from(part) * 200 + u128::from(whole)) / (u128::from(whole) * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}
