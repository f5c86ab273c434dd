//! Shared fixtures for integration tests: an in-memory chapter store and cache helpers.
#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use chaptrack::application::analytics::AnalyticsService;
use chaptrack::application::chapters::ChapterService;
use chaptrack::application::repos::{
    ChapterQueryFilter, ChaptersRepo, ChaptersWriteRepo, DistinctValues, RepoError, StatusTally,
    SubjectTally,
};
use chaptrack::cache::{BackendError, CacheBackend, CacheConfig, CacheService, MemoryBackend};
use chaptrack::domain::chapters::ChapterDraft;
use chaptrack::domain::entities::ChapterRecord;
use chaptrack::domain::types::{ChapterStatus, ClassLevel, Subject};

/// Vec-backed store with failure switches and read counters.
pub struct InMemoryChapters {
    rows: Mutex<Vec<ChapterRecord>>,
    clock: AtomicI64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Writes allowed before the store starts timing out; negative means unlimited.
    write_budget: AtomicI64,
    reads: AtomicUsize,
}

impl Default for InMemoryChapters {
    fn default() -> Self {
        Self {
            rows: Mutex::default(),
            clock: AtomicI64::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            write_budget: AtomicI64::new(-1),
            reads: AtomicUsize::new(0),
        }
    }
}

impl InMemoryChapters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes_after(&self, writes: i64) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store round trips for list, count and id lookups.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    fn check_read(&self) -> Result<(), RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("store offline".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        let budget = self.write_budget.load(Ordering::SeqCst);
        if budget == 0 {
            return Err(RepoError::Timeout);
        }
        if budget > 0 {
            self.write_budget.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Strictly increasing timestamps so "newest first" is deterministic.
    fn tick(&self) -> OffsetDateTime {
        let step = self.clock.fetch_add(1, Ordering::SeqCst);
        OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(1_700_000_000 + step)
    }

    async fn matching(&self, filter: &ChapterQueryFilter) -> Vec<ChapterRecord> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<ChapterRecord> = rows
            .iter()
            .filter(|row| matches(row, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matched
    }
}

fn matches(row: &ChapterRecord, filter: &ChapterQueryFilter) -> bool {
    filter.subject.is_none_or(|subject| row.subject == subject)
        && filter.class.is_none_or(|class| row.class == class)
        && filter.unit.as_deref().is_none_or(|unit| row.unit == unit)
        && filter.status.is_none_or(|status| row.status == status)
        && filter.weak.is_none_or(|weak| row.is_weak_chapter == weak)
}

fn record_from_draft(id: Uuid, draft: &ChapterDraft, at: OffsetDateTime) -> ChapterRecord {
    ChapterRecord {
        id,
        subject: draft.subject,
        chapter: draft.chapter.clone(),
        class: draft.class,
        unit: draft.unit.clone(),
        year_wise_question_count: draft.year_wise_question_count.clone(),
        question_solved: draft.question_solved,
        status: draft.status,
        is_weak_chapter: draft.is_weak_chapter,
        created_at: at,
        updated_at: at,
    }
}

#[async_trait]
impl ChaptersRepo for InMemoryChapters {
    async fn list_chapters(
        &self,
        filter: &ChapterQueryFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ChapterRecord>, RepoError> {
        self.check_read()?;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(self
            .matching(filter)
            .await
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect())
    }

    async fn count_chapters(&self, filter: &ChapterQueryFilter) -> Result<u64, RepoError> {
        self.check_read()?;
        Ok(self.matching(filter).await.len() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepoError> {
        self.check_read()?;
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn status_tally(&self) -> Result<StatusTally, RepoError> {
        self.check_read()?;
        let rows = self.rows.lock().await;
        let mut tally = StatusTally::default();
        for row in rows.iter() {
            tally.total += 1;
            match row.status {
                ChapterStatus::Completed => tally.completed += 1,
                ChapterStatus::InProgress => tally.in_progress += 1,
                ChapterStatus::NotStarted => tally.not_started += 1,
            }
            if row.is_weak_chapter {
                tally.weak += 1;
            }
        }
        Ok(tally)
    }

    async fn subject_tallies(&self) -> Result<Vec<SubjectTally>, RepoError> {
        self.check_read()?;
        let rows = self.rows.lock().await;
        let mut tallies: Vec<SubjectTally> = Subject::ALL
            .iter()
            .map(|subject| {
                let of_subject = rows.iter().filter(|row| row.subject == *subject);
                SubjectTally {
                    subject: *subject,
                    count: of_subject.clone().count() as u64,
                    completed: of_subject
                        .clone()
                        .filter(|row| row.status == ChapterStatus::Completed)
                        .count() as u64,
                    weak: of_subject.filter(|row| row.is_weak_chapter).count() as u64,
                }
            })
            .filter(|tally| tally.count > 0)
            .collect();
        tallies.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(tallies)
    }

    async fn distinct_values(&self) -> Result<DistinctValues, RepoError> {
        self.check_read()?;
        let rows = self.rows.lock().await;
        let mut units: Vec<String> = rows.iter().map(|row| row.unit.clone()).collect();
        units.sort();
        units.dedup();
        Ok(DistinctValues {
            subjects: Subject::ALL
                .into_iter()
                .filter(|s| rows.iter().any(|row| row.subject == *s))
                .collect(),
            classes: ClassLevel::ALL
                .into_iter()
                .filter(|c| rows.iter().any(|row| row.class == *c))
                .collect(),
            units,
            statuses: ChapterStatus::ALL
                .into_iter()
                .filter(|s| rows.iter().any(|row| row.status == *s))
                .collect(),
        })
    }

    async fn ping(&self) -> Result<(), RepoError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChaptersWriteRepo for InMemoryChapters {
    async fn create_chapter(&self, draft: &ChapterDraft) -> Result<ChapterRecord, RepoError> {
        self.check_write()?;
        let record = record_from_draft(Uuid::new_v4(), draft, self.tick());
        self.rows.lock().await.push(record.clone());
        Ok(record)
    }

    async fn update_chapter(
        &self,
        id: Uuid,
        draft: &ChapterDraft,
    ) -> Result<Option<ChapterRecord>, RepoError> {
        self.check_write()?;
        let now = self.tick();
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(None);
        };
        let created_at = row.created_at;
        *row = record_from_draft(id, draft, now);
        row.created_at = created_at;
        Ok(Some(row.clone()))
    }

    async fn delete_chapter(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check_write()?;
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        self.check_write()?;
        let mut rows = self.rows.lock().await;
        let removed = rows.len() as u64;
        rows.clear();
        Ok(removed)
    }
}

/// Cache backend that fails every operation.
pub struct UnavailableBackend;

#[async_trait]
impl CacheBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Err(BackendError::backend("connection refused"))
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), BackendError> {
        Err(BackendError::backend("connection refused"))
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, BackendError> {
        Err(BackendError::backend("connection refused"))
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, BackendError> {
        Err(BackendError::backend("connection refused"))
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Err(BackendError::backend("connection refused"))
    }
}

pub fn memory_backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(
        NonZeroUsize::new(1024).expect("non-zero capacity"),
    ))
}

pub fn memory_cache(backend: Arc<MemoryBackend>) -> CacheService {
    CacheService::new(backend, CacheConfig::default())
}

/// Memory cache that also drops analytics and filter entries on every write.
pub fn eager_aggregate_cache(backend: Arc<MemoryBackend>) -> CacheService {
    let config = CacheConfig {
        invalidate_aggregates_on_write: true,
        ..CacheConfig::default()
    };
    CacheService::new(backend, config)
}

pub fn unavailable_cache() -> CacheService {
    CacheService::new(Arc::new(UnavailableBackend), CacheConfig::default())
}

pub fn services(
    store: Arc<InMemoryChapters>,
    cache: CacheService,
) -> (Arc<ChapterService>, Arc<AnalyticsService>) {
    let reader: Arc<dyn ChaptersRepo> = store.clone();
    let writer: Arc<dyn ChaptersWriteRepo> = store;
    let chapters = Arc::new(ChapterService::new(reader.clone(), writer, cache.clone()));
    let analytics = Arc::new(AnalyticsService::new(reader, cache));
    (chapters, analytics)
}

pub fn chapter_json(subject: &str, chapter: &str, status: &str, weak: bool) -> Value {
    json!({
        "subject": subject,
        "chapter": chapter,
        "class": "Class 11",
        "unit": "Mechanics 1",
        "yearWiseQuestionCount": { "2019": 3, "2020": 4, "2021": 3 },
        "questionSolved": 5,
        "status": status,
        "isWeakChapter": weak
    })
}

pub fn physics(chapter: &str) -> Value {
    chapter_json("Physics", chapter, "Not Started", false)
}
