use std::sync::Arc;
use std::time::Instant;

use crate::application::analytics::AnalyticsService;
use crate::application::chapters::ChapterService;
use crate::application::repos::ChaptersRepo;
use crate::cache::CacheService;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub chapters: Arc<ChapterService>,
    pub analytics: Arc<AnalyticsService>,
    pub store: Arc<dyn ChaptersRepo>,
    pub cache: CacheService,
    /// Shared admin secret; `None` rejects every admin request.
    pub admin_token: Option<Arc<str>>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    pub started_at: Instant,
}
