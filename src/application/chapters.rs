use std::sync::Arc;

use chaptrack_api_types::{BulkCreateReport, BulkCreated, BulkFailure, ChapterPage, ChapterResponse};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{ChapterQueryFilter, ChaptersRepo, ChaptersWriteRepo, RepoError};
use crate::cache::{
    ANALYTICS_NAMESPACE, CacheService, ENTITY_NAMESPACE, FILTERS_NAMESPACE, LIST_NAMESPACE,
    entity_key, list_key, namespace_pattern,
};
use crate::domain::chapters::ChapterDraft;
use crate::domain::error::ValidationErrors;

const SOURCE: &str = "application::chapters";

pub const BULK_ITEM_CREATED: &str = "Successfully created";

#[derive(Debug, Error)]
pub enum ChapterServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Chapters array cannot be empty")]
    EmptyBatch,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ChapterService {
    reader: Arc<dyn ChaptersRepo>,
    writer: Arc<dyn ChaptersWriteRepo>,
    cache: CacheService,
}

impl ChapterService {
    pub fn new(
        reader: Arc<dyn ChaptersRepo>,
        writer: Arc<dyn ChaptersWriteRepo>,
        cache: CacheService,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    /// One page of chapters matching `filter`, newest first.
    pub async fn list(
        &self,
        filter: &ChapterQueryFilter,
        page: PageRequest,
    ) -> Result<ChapterPage, ChapterServiceError> {
        let key = list_key(filter, page);
        if let Some(cached) = self.cache.get::<ChapterPage>(&key).await {
            return Ok(cached);
        }

        let (records, total) = tokio::try_join!(
            self.reader
                .list_chapters(filter, page.offset(), page.limit()),
            self.reader.count_chapters(filter),
        )?;

        let result = ChapterPage {
            chapters: records.iter().map(ChapterResponse::from).collect(),
            pagination: page.meta(total),
        };
        self.cache.set(&key, &result, None).await;
        Ok(result)
    }

    /// Unknown ids are reported as `None` and never cached.
    pub async fn get(&self, id: Uuid) -> Result<Option<ChapterResponse>, ChapterServiceError> {
        let key = entity_key(id);
        if let Some(cached) = self.cache.get::<ChapterResponse>(&key).await {
            return Ok(Some(cached));
        }

        let Some(record) = self.reader.find_by_id(id).await? else {
            return Ok(None);
        };
        let chapter = ChapterResponse::from(record);
        self.cache.set(&key, &chapter, None).await;
        Ok(Some(chapter))
    }

    pub async fn create(&self, payload: &Value) -> Result<ChapterResponse, ChapterServiceError> {
        let draft = ChapterDraft::from_json(payload)?;
        let record = self.writer.create_chapter(&draft).await?;
        self.invalidate_after_write().await;
        info!(
            target = SOURCE,
            chapter_id = %record.id,
            subject = %record.subject,
            "Chapter created"
        );
        Ok(record.into())
    }

    /// Insert every record independently, in order.
    ///
    /// Records that fail validation or are rejected by the store are reported
    /// with their original index and payload. A store outage aborts the batch;
    /// anything committed before it still invalidates the cache.
    pub async fn bulk_create(
        &self,
        records: Vec<Value>,
    ) -> Result<BulkCreateReport, ChapterServiceError> {
        if records.is_empty() {
            return Err(ChapterServiceError::EmptyBatch);
        }

        let mut report = BulkCreateReport::default();
        for (index, raw) in records.into_iter().enumerate() {
            let draft = match ChapterDraft::from_json(&raw) {
                Ok(draft) => draft,
                Err(errors) => {
                    report.failed.push(BulkFailure {
                        index,
                        chapter: raw,
                        error: errors.to_string(),
                    });
                    continue;
                }
            };

            match self.writer.create_chapter(&draft).await {
                Ok(record) => report.successful.push(BulkCreated {
                    index,
                    chapter: record.into(),
                    message: BULK_ITEM_CREATED.to_string(),
                }),
                Err(err) if err.is_record_level() => report.failed.push(BulkFailure {
                    index,
                    chapter: raw,
                    error: err.to_string(),
                }),
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        index,
                        stored = report.successful.len(),
                        error = %err,
                        "Bulk create aborted by store failure"
                    );
                    if report.is_success() {
                        self.invalidate_after_write().await;
                    }
                    return Err(err.into());
                }
            }
        }

        if report.is_success() {
            self.invalidate_after_write().await;
        }
        info!(
            target = SOURCE,
            successful = report.successful.len(),
            failed = report.failed.len(),
            "Bulk create finished"
        );
        Ok(report)
    }

    /// Replace a chapter; `None` when the id is unknown.
    pub async fn update(
        &self,
        id: Uuid,
        payload: &Value,
    ) -> Result<Option<ChapterResponse>, ChapterServiceError> {
        let draft = ChapterDraft::from_json(payload)?;
        let Some(record) = self.writer.update_chapter(id, &draft).await? else {
            return Ok(None);
        };
        self.invalidate_after_write().await;
        info!(target = SOURCE, chapter_id = %id, "Chapter updated");
        Ok(Some(record.into()))
    }

    /// Returns whether the chapter existed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, ChapterServiceError> {
        let removed = self.writer.delete_chapter(id).await?;
        if removed {
            self.invalidate_after_write().await;
            info!(target = SOURCE, chapter_id = %id, "Chapter deleted");
        }
        Ok(removed)
    }

    /// Remove every chapter. Used by the seeding command.
    pub async fn clear(&self) -> Result<u64, ChapterServiceError> {
        let removed = self.writer.delete_all().await?;
        if removed > 0 {
            self.invalidate_after_write().await;
        }
        Ok(removed)
    }

    async fn invalidate_after_write(&self) {
        let mut namespaces = vec![LIST_NAMESPACE, ENTITY_NAMESPACE];
        if self.cache.config().invalidate_aggregates_on_write {
            namespaces.extend([ANALYTICS_NAMESPACE, FILTERS_NAMESPACE]);
        }

        for namespace in namespaces {
            self.cache
                .invalidate_pattern(&namespace_pattern(namespace))
                .await;
        }
    }
}
