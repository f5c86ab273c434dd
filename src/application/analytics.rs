use std::sync::Arc;

use chaptrack_api_types::{AnalyticsOverview, FilterOptions, OverviewCounts, SubjectDistribution};

use crate::application::repos::{ChaptersRepo, RepoError};
use crate::cache::{ANALYTICS_OVERVIEW_KEY, CacheService, FILTER_OPTIONS_KEY};
use crate::domain::entities::rounded_percentage;

/// Cached views computed over the whole collection.
///
/// Entries are refreshed by TTL; chapter writes only drop them when
/// `cache.invalidate_aggregates_on_write` is set.
#[derive(Clone)]
pub struct AnalyticsService {
    reader: Arc<dyn ChaptersRepo>,
    cache: CacheService,
}

impl AnalyticsService {
    pub fn new(reader: Arc<dyn ChaptersRepo>, cache: CacheService) -> Self {
        Self { reader, cache }
    }

    pub async fn overview(&self) -> Result<AnalyticsOverview, RepoError> {
        if let Some(cached) = self
            .cache
            .get::<AnalyticsOverview>(ANALYTICS_OVERVIEW_KEY)
            .await
        {
            return Ok(cached);
        }

        let (tally, subjects) =
            tokio::try_join!(self.reader.status_tally(), self.reader.subject_tallies())?;

        let result = AnalyticsOverview {
            overview: OverviewCounts {
                total_chapters: tally.total,
                completed_chapters: tally.completed,
                in_progress_chapters: tally.in_progress,
                not_started_chapters: tally.not_started,
                weak_chapters: tally.weak,
                completion_percentage: rounded_percentage(tally.completed, tally.total),
            },
            subject_distribution: subjects
                .into_iter()
                .map(|subject| SubjectDistribution {
                    subject: subject.subject,
                    count: subject.count,
                    completed: subject.completed,
                    weak_chapters: subject.weak,
                })
                .collect(),
        };

        let ttl = self.cache.config().analytics_ttl;
        self.cache
            .set(ANALYTICS_OVERVIEW_KEY, &result, Some(ttl))
            .await;
        Ok(result)
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, RepoError> {
        if let Some(cached) = self.cache.get::<FilterOptions>(FILTER_OPTIONS_KEY).await {
            return Ok(cached);
        }

        let values = self.reader.distinct_values().await?;
        let result = FilterOptions {
            subjects: values.subjects,
            classes: values.classes,
            units: values.units,
            statuses: values.statuses,
        };
        self.cache.set(FILTER_OPTIONS_KEY, &result, None).await;
        Ok(result)
    }
}
