//! Cache key definitions.
//!
//! Keys are plain strings relative to the configured prefix. Filter values are
//! form-urlencoded so a `:` inside a unit name can never shift the field
//! boundaries of a list key.

use url::form_urlencoded;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::ChapterQueryFilter;

pub const DEFAULT_KEY_PREFIX: &str = "chapter-api:";

pub const LIST_NAMESPACE: &str = "chapters";
pub const ENTITY_NAMESPACE: &str = "entity";
pub const ANALYTICS_NAMESPACE: &str = "analytics";
pub const FILTERS_NAMESPACE: &str = "filters";

pub const ANALYTICS_OVERVIEW_KEY: &str = "analytics:overview";
pub const FILTER_OPTIONS_KEY: &str = "filters:options";

/// Identifies one cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    ChapterList {
        filter: ChapterQueryFilter,
        page: PageRequest,
    },
    Chapter(Uuid),
    AnalyticsOverview,
    FilterOptions,
}

impl CacheKey {
    pub fn render(&self) -> String {
        match self {
            CacheKey::ChapterList { filter, page } => list_key(filter, *page),
            CacheKey::Chapter(id) => entity_key(*id),
            CacheKey::AnalyticsOverview => ANALYTICS_OVERVIEW_KEY.to_string(),
            CacheKey::FilterOptions => FILTER_OPTIONS_KEY.to_string(),
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            CacheKey::ChapterList { .. } => LIST_NAMESPACE,
            CacheKey::Chapter(_) => ENTITY_NAMESPACE,
            CacheKey::AnalyticsOverview => ANALYTICS_NAMESPACE,
            CacheKey::FilterOptions => FILTERS_NAMESPACE,
        }
    }
}

/// Key for one page of a filtered listing.
///
/// Only the filters that are set contribute a segment, always in the order
/// subject, class, unit, status, weak; page and limit close the key.
pub fn list_key(filter: &ChapterQueryFilter, page: PageRequest) -> String {
    let mut key = String::from(LIST_NAMESPACE);
    let mut segment = |name: &str, value: &str| {
        key.push(':');
        key.push_str(name);
        key.push(':');
        key.extend(form_urlencoded::byte_serialize(value.as_bytes()));
    };

    if let Some(subject) = filter.subject {
        segment("subject", subject.as_str());
    }
    if let Some(class) = filter.class {
        segment("class", class.as_str());
    }
    if let Some(unit) = filter.unit.as_deref() {
        segment("unit", unit);
    }
    if let Some(status) = filter.status {
        segment("status", status.as_str());
    }
    if let Some(weak) = filter.weak {
        segment("weak", if weak { "true" } else { "false" });
    }
    segment("page", &page.page().to_string());
    segment("limit", &page.limit().to_string());
    key
}

pub fn entity_key(id: Uuid) -> String {
    format!("{ENTITY_NAMESPACE}:{id}")
}

/// Glob matching every key in a namespace.
pub fn namespace_pattern(namespace: &str) -> String {
    format!("{namespace}:*")
}

/// Namespace label for a rendered key, used for metrics.
pub fn namespace_of(key: &str) -> &str {
    key.split_once(':').map_or(key, |(namespace, _)| namespace)
}

#[cfg(test)]
mod tests {
    use crate::domain::types::{ChapterStatus, ClassLevel, Subject};

    use super::*;

    #[test]
    fn unfiltered_list_key_carries_page_and_limit() {
        let key = list_key(&ChapterQueryFilter::default(), PageRequest::default());
        assert_eq!(key, "chapters:page:1:limit:10");
    }

    #[test]
    fn list_key_uses_fixed_field_order() {
        let filter = ChapterQueryFilter {
            subject: Some(Subject::Physics),
            class: Some(ClassLevel::Class12),
            unit: Some("Mechanics 1".to_string()),
            status: Some(ChapterStatus::InProgress),
            weak: Some(true),
        };
        let page = PageRequest::new(2, 20).unwrap();
        assert_eq!(
            list_key(&filter, page),
            "chapters:subject:Physics:class:Class+12:unit:Mechanics+1:status:In+Progress:weak:true:page:2:limit:20"
        );
    }

    #[test]
    fn separators_inside_values_are_encoded() {
        let filter = ChapterQueryFilter {
            unit: Some("a:status:Completed".to_string()),
            ..Default::default()
        };
        let key = list_key(&filter, PageRequest::default());
        assert_eq!(key, "chapters:unit:a%3Astatus%3ACompleted:page:1:limit:10");
    }

    #[test]
    fn entity_and_aggregate_keys() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::Chapter(id).render(),
            "entity:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(CacheKey::AnalyticsOverview.render(), "analytics:overview");
        assert_eq!(CacheKey::FilterOptions.namespace(), "filters");
        assert_eq!(namespace_pattern(LIST_NAMESPACE), "chapters:*");
        assert_eq!(namespace_of("entity:abc"), "entity");
    }
}
