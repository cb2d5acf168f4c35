//! Search query and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind, PrimaryField, Searchable};

/// Inclusive time window matched against an entity's `updated_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// A free-text query with optional hard filters.
///
/// Filters are AND'ed with text relevance: an entity failing any filter is
/// excluded regardless of how well its text matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Whitespace-separated search terms
    pub text: String,

    /// Exact category id
    #[serde(default)]
    pub category: Option<String>,

    /// Restrict to one entity kind
    #[serde(default, rename = "type")]
    pub kind: Option<EntityKind>,

    /// Entity must carry at least one of these tags (case-insensitive)
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub industry: Option<String>,

    #[serde(default)]
    pub date_range: Option<DateRange>,

    /// Score each term once per field instead of per occurrence
    #[serde(default)]
    pub exact_match: bool,

    /// Truncate results after sorting
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_exact_match(mut self, exact: bool) -> Self {
        self.exact_match = exact;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub entity: Entity,
    pub kind: EntityKind,
    pub relevance_score: f32,
    pub matched_fields: Vec<PrimaryField>,
    pub highlights: Vec<String>,
}

impl SearchResult {
    pub fn id(&self) -> &str {
        self.entity.id()
    }
}
