//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::chapters::ChapterDraft;
use crate::domain::entities::ChapterRecord;
use crate::domain::types::{ChapterStatus, ClassLevel, Subject};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Rejections tied to the submitted record rather than to the store itself.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            RepoError::Duplicate { .. }
                | RepoError::InvalidInput { .. }
                | RepoError::Integrity { .. }
        )
    }
}

/// Exact-match predicates applied to a chapter listing. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChapterQueryFilter {
    pub subject: Option<Subject>,
    pub class: Option<ClassLevel>,
    pub unit: Option<String>,
    pub status: Option<ChapterStatus>,
    pub weak: Option<bool>,
}

/// Per-subject totals used by the analytics overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTally {
    pub subject: Subject,
    pub count: u64,
    pub completed: u64,
    pub weak: u64,
}

/// Collection-wide counters used by the analytics overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub total: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub not_started: u64,
    pub weak: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinctValues {
    pub subjects: Vec<Subject>,
    pub classes: Vec<ClassLevel>,
    pub units: Vec<String>,
    pub statuses: Vec<ChapterStatus>,
}

#[async_trait]
pub trait ChaptersRepo: Send + Sync {
    /// Matching chapters, newest first.
    async fn list_chapters(
        &self,
        filter: &ChapterQueryFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ChapterRecord>, RepoError>;

    async fn count_chapters(&self, filter: &ChapterQueryFilter) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepoError>;

    async fn status_tally(&self) -> Result<StatusTally, RepoError>;

    /// Per-subject tallies, sorted by count descending.
    async fn subject_tallies(&self) -> Result<Vec<SubjectTally>, RepoError>;

    async fn distinct_values(&self) -> Result<DistinctValues, RepoError>;

    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ChaptersWriteRepo: Send + Sync {
    async fn create_chapter(&self, draft: &ChapterDraft) -> Result<ChapterRecord, RepoError>;

    /// Replace every stored field of a chapter; `None` when the id is unknown.
    async fn update_chapter(
        &self,
        id: Uuid,
        draft: &ChapterDraft,
    ) -> Result<Option<ChapterRecord>, RepoError>;

    /// Returns whether a row was removed.
    async fn delete_chapter(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Remove every chapter, returning how many rows were deleted.
    async fn delete_all(&self) -> Result<u64, RepoError>;
}
