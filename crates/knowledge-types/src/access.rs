//! Access telemetry types.
//!
//! Access counters are tracked next to the entities rather than inside them,
//! so a view never needs a write on the content store. They are folded back
//! into [`EntityMeta`](crate::EntityMeta) when an entity is handed out or
//! exported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityKind, EntityMeta};

/// What an access event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Search,
    Formula,
    Calculation,
    Document,
    Dataset,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Search => "search",
            AccessKind::Formula => "formula",
            AccessKind::Calculation => "calculation",
            AccessKind::Document => "document",
            AccessKind::Dataset => "dataset",
        }
    }
}

impl From<EntityKind> for AccessKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Formula => AccessKind::Formula,
            EntityKind::Calculation => AccessKind::Calculation,
            EntityKind::Document => AccessKind::Document,
            EntityKind::Dataset => AccessKind::Dataset,
        }
    }
}

impl std::fmt::Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the recent-access log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    /// Search text, or the id of the viewed entity
    pub id: String,
    pub kind: AccessKind,
    pub timestamp: DateTime<Utc>,
}

impl AccessEvent {
    pub fn new(id: impl Into<String>, kind: AccessKind) -> Self {
        Self {
            id: id.into(),
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Usage statistics for one entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageStats {
    /// Number of times this entity was accessed
    pub access_count: u32,

    /// Last access timestamp (None if never accessed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl UsageStats {
    /// Create new usage stats with zero access.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment access count and update timestamp.
    pub fn record_access(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = Some(Utc::now());
    }

    /// Add these counts on top of an entity's stored bookkeeping.
    pub fn fold_into(&self, meta: &mut EntityMeta) {
        meta.access_count = meta.access_count.saturating_add(self.access_count);
        meta.last_accessed = match (meta.last_accessed, self.last_accessed) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_stats_default() {
        let stats = UsageStats::new();
        assert_eq!(stats.access_count, 0);
        assert!(stats.last_accessed.is_none());
    }

    #[test]
    fn test_usage_stats_record_access() {
        let mut stats = UsageStats::new();
        stats.record_access();
        assert_eq!(stats.access_count, 1);
        assert!(stats.last_accessed.is_some());

        stats.record_access();
        assert_eq!(stats.access_count, 2);
    }

    #[test]
    fn test_usage_stats_saturating_add() {
        let mut stats = UsageStats {
            access_count: u32::MAX,
            last_accessed: None,
        };
        stats.record_access();
        assert_eq!(stats.access_count, u32::MAX);
    }

    #[test]
    fn test_fold_into_adds_counts() {
        let mut meta = EntityMeta::new(Utc::now());
        meta.access_count = 5;

        let mut stats = UsageStats::new();
        stats.record_access();
        stats.record_access();
        stats.fold_into(&mut meta);

        assert_eq!(meta.access_count, 7);
        assert_eq!(meta.last_accessed, stats.last_accessed);
    }

    #[test]
    fn test_fold_into_keeps_newer_timestamp() {
        let mut meta = EntityMeta::new(Utc::now());
        let later = Utc::now() + chrono::Duration::hours(1);
        meta.last_accessed = Some(later);

        let mut stats = UsageStats::new();
        stats.record_access();
        stats.fold_into(&mut meta);

        assert_eq!(meta.last_accessed, Some(later));
    }

    #[test]
    fn test_access_kind_from_entity_kind() {
        assert_eq!(AccessKind::from(EntityKind::Document), AccessKind::Document);
        assert_eq!(AccessKind::Search.to_string(), "search");
        let json = serde_json::to_string(&AccessKind::Dataset).unwrap();
        assert_eq!(json, "\"dataset\"");
    }
}
