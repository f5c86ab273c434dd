use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    ChapterQueryFilter, ChaptersRepo, ChaptersWriteRepo, DistinctValues, RepoError, StatusTally,
    SubjectTally,
};
use crate::domain::chapters::ChapterDraft;
use crate::domain::entities::ChapterRecord;
use crate::domain::types::{ChapterStatus, ClassLevel, Subject};

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

const CHAPTER_COLUMNS: &str = "id, subject, chapter, class_level, unit, \
    year_wise_question_count, question_solved, status, is_weak_chapter, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ChapterRow {
    id: Uuid,
    subject: Subject,
    chapter: String,
    class_level: ClassLevel,
    unit: String,
    year_wise_question_count: Json<BTreeMap<String, u32>>,
    question_solved: i32,
    status: ChapterStatus,
    is_weak_chapter: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<ChapterRow> for ChapterRecord {
    type Error = RepoError;

    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        let question_solved = u32::try_from(row.question_solved).map_err(|_| {
            RepoError::from_persistence(format!(
                "chapter {} has a negative question_solved",
                row.id
            ))
        })?;
        Ok(Self {
            id: row.id,
            subject: row.subject,
            chapter: row.chapter,
            class: row.class_level,
            unit: row.unit,
            year_wise_question_count: row.year_wise_question_count.0,
            question_solved,
            status: row.status,
            is_weak_chapter: row.is_weak_chapter,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatusTallyRow {
    total: i64,
    completed: i64,
    in_progress: i64,
    not_started: i64,
    weak: i64,
}

#[derive(sqlx::FromRow)]
struct SubjectTallyRow {
    subject: Subject,
    count: i64,
    completed: i64,
    weak: i64,
}

fn apply_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ChapterQueryFilter) {
    if let Some(subject) = filter.subject {
        qb.push(" AND subject = ");
        qb.push_bind(subject);
    }
    if let Some(class) = filter.class {
        qb.push(" AND class_level = ");
        qb.push_bind(class);
    }
    if let Some(unit) = filter.unit.as_ref() {
        qb.push(" AND unit = ");
        qb.push_bind(unit.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(weak) = filter.weak {
        qb.push(" AND is_weak_chapter = ");
        qb.push_bind(weak);
    }
}

fn solved_param(draft: &ChapterDraft) -> Result<i32, RepoError> {
    i32::try_from(draft.question_solved).map_err(|_| RepoError::InvalidInput {
        message: "questionSolved exceeds the supported range".to_string(),
    })
}

fn into_records(rows: Vec<ChapterRow>) -> Result<Vec<ChapterRecord>, RepoError> {
    rows.into_iter().map(ChapterRecord::try_from).collect()
}

#[async_trait]
impl ChaptersRepo for PostgresRepositories {
    async fn list_chapters(
        &self,
        filter: &ChapterQueryFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ChapterRecord>, RepoError> {
        let offset = i64::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: "page offset exceeds the supported range".to_string(),
        })?;

        let mut qb = QueryBuilder::new(format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE 1=1"));
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<ChapterRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        into_records(rows)
    }

    async fn count_chapters(&self, filter: &ChapterQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM chapters WHERE 1=1");
        apply_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepoError> {
        let row = sqlx::query_as::<_, ChapterRow>(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ChapterRecord::try_from).transpose()
    }

    async fn status_tally(&self) -> Result<StatusTally, RepoError> {
        let row = sqlx::query_as::<_, StatusTallyRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'Completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'In Progress') AS in_progress,
                COUNT(*) FILTER (WHERE status = 'Not Started') AS not_started,
                COUNT(*) FILTER (WHERE is_weak_chapter) AS weak
            FROM chapters
            "#,
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(StatusTally {
            total: convert_count(row.total)?,
            completed: convert_count(row.completed)?,
            in_progress: convert_count(row.in_progress)?,
            not_started: convert_count(row.not_started)?,
            weak: convert_count(row.weak)?,
        })
    }

    async fn subject_tallies(&self) -> Result<Vec<SubjectTally>, RepoError> {
        let rows = sqlx::query_as::<_, SubjectTallyRow>(
            r#"
            SELECT
                subject,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE status = 'Completed') AS completed,
                COUNT(*) FILTER (WHERE is_weak_chapter) AS weak
            FROM chapters
            GROUP BY subject
            ORDER BY count DESC, subject
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(SubjectTally {
                    subject: row.subject,
                    count: convert_count(row.count)?,
                    completed: convert_count(row.completed)?,
                    weak: convert_count(row.weak)?,
                })
            })
            .collect()
    }

    async fn distinct_values(&self) -> Result<DistinctValues, RepoError> {
        let pool = self.pool();
        let (subjects, classes, units, statuses) = tokio::try_join!(
            sqlx::query_scalar::<_, Subject>(
                "SELECT DISTINCT subject FROM chapters ORDER BY subject"
            )
            .fetch_all(pool),
            sqlx::query_scalar::<_, ClassLevel>(
                "SELECT DISTINCT class_level FROM chapters ORDER BY class_level"
            )
            .fetch_all(pool),
            sqlx::query_scalar::<_, String>("SELECT DISTINCT unit FROM chapters ORDER BY unit")
                .fetch_all(pool),
            sqlx::query_scalar::<_, ChapterStatus>(
                "SELECT DISTINCT status FROM chapters ORDER BY status"
            )
            .fetch_all(pool),
        )
        .map_err(map_sqlx_error)?;

        Ok(DistinctValues {
            subjects,
            classes,
            units,
            statuses,
        })
    }

    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ChaptersWriteRepo for PostgresRepositories {
    async fn create_chapter(&self, draft: &ChapterDraft) -> Result<ChapterRecord, RepoError> {
        let row = sqlx::query_as::<_, ChapterRow>(&format!(
            "INSERT INTO chapters \
                (subject, chapter, class_level, unit, year_wise_question_count, \
                 question_solved, status, is_weak_chapter) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {CHAPTER_COLUMNS}"
        ))
        .bind(draft.subject)
        .bind(&draft.chapter)
        .bind(draft.class)
        .bind(&draft.unit)
        .bind(Json(&draft.year_wise_question_count))
        .bind(solved_param(draft)?)
        .bind(draft.status)
        .bind(draft.is_weak_chapter)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        ChapterRecord::try_from(row)
    }

    async fn update_chapter(
        &self,
        id: Uuid,
        draft: &ChapterDraft,
    ) -> Result<Option<ChapterRecord>, RepoError> {
        let row = sqlx::query_as::<_, ChapterRow>(&format!(
            "UPDATE chapters SET \
                subject = $2, chapter = $3, class_level = $4, unit = $5, \
                year_wise_question_count = $6, question_solved = $7, status = $8, \
                is_weak_chapter = $9, updated_at = now() \
             WHERE id = $1 \
             RETURNING {CHAPTER_COLUMNS}"
        ))
        .bind(id)
        .bind(draft.subject)
        .bind(&draft.chapter)
        .bind(draft.class)
        .bind(&draft.unit)
        .bind(Json(&draft.year_wise_question_count))
        .bind(solved_param(draft)?)
        .bind(draft.status)
        .bind(draft.is_weak_chapter)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ChapterRecord::try_from).transpose()
    }

    async fn delete_chapter(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM chapters")
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
