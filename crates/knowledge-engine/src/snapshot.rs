//! Snapshot capture and staged import.
//!
//! Import never touches the live store: every entity is validated and applied
//! to a copy, and only a copy that took every entity is handed back for the
//! engine to publish. Ids stay unique across kinds.

use std::collections::BTreeSet;

use chrono::Utc;
use knowledge_store::{AccessTracker, ContentStore};
use knowledge_types::{
    Entity, EntityKind, KnowledgeError, Searchable, Snapshot, FORMAT_VERSION,
};
use tracing::debug;

/// Export the store, folding counted views into each entity's metadata.
pub fn capture(store: &ContentStore, tracker: &AccessTracker) -> Snapshot {
    fn folded<T: Searchable + Clone>(items: &[T], tracker: &AccessTracker) -> Vec<T> {
        items
            .iter()
            .cloned()
            .map(|mut item| {
                tracker
                    .usage(item.kind(), item.id())
                    .fold_into(item.meta_mut());
                item
            })
            .collect()
    }

    Snapshot {
        categories: store.categories().to_vec(),
        formulas: folded(store.formulas(), tracker),
        calculations: folded(store.calculations(), tracker),
        documents: folded(store.documents(), tracker),
        datasets: folded(store.datasets(), tracker),
        exported_at: Utc::now(),
        format_version: FORMAT_VERSION.to_string(),
    }
}

/// Result of applying a snapshot to a copy of the store.
pub struct StagedImport {
    pub store: ContentStore,
    /// (kind, id) of every distinct entity written
    pub written: BTreeSet<(EntityKind, String)>,
}

impl StagedImport {
    /// Entities applied (categories excluded).
    pub fn count(&self) -> usize {
        self.written.len()
    }
}

/// Apply a snapshot to a copy of `base`, upserting by id.
///
/// An id repeated within one kind is applied in order, last row wins, and
/// counted once. Fails on the first invalid category or entity, or on an id
/// already held by another kind; `base` is never modified.
pub fn stage(base: &ContentStore, snapshot: Snapshot) -> Result<StagedImport, KnowledgeError> {
    snapshot.check_version()?;

    let mut store = base.clone();
    let mut written = BTreeSet::new();

    for category in snapshot.categories {
        if category.name.trim().is_empty() {
            return Err(KnowledgeError::Import(format!(
                "category {:?} has no name",
                category.id
            )));
        }
        store
            .put_category(category)
            .map_err(|e| KnowledgeError::Import(e.to_string()))?;
    }

    let entities = snapshot
        .formulas
        .into_iter()
        .map(Entity::from)
        .chain(snapshot.calculations.into_iter().map(Entity::from))
        .chain(snapshot.documents.into_iter().map(Entity::from))
        .chain(snapshot.datasets.into_iter().map(Entity::from));

    for entity in entities {
        check_entity(&entity)?;
        check_unique(&store, &entity)?;
        let key = (entity.kind(), entity.id().to_string());
        store
            .put(entity)
            .map_err(|e| KnowledgeError::Import(e.to_string()))?;
        written.insert(key);
    }

    debug!(entities = written.len(), "Staged snapshot import");
    Ok(StagedImport { store, written })
}

/// Imported entities are held to the same field rules as `add_*` drafts.
fn check_entity(entity: &Entity) -> Result<(), KnowledgeError> {
    entity.validate().map_err(|e| match e {
        KnowledgeError::Validation(msg) => {
            KnowledgeError::Import(format!("{} {:?}: {}", entity.kind(), entity.id(), msg))
        }
        other => KnowledgeError::Import(other.to_string()),
    })
}

/// `store` already holds the base plus every earlier row of the snapshot.
fn check_unique(store: &ContentStore, entity: &Entity) -> Result<(), KnowledgeError> {
    let kind = entity.kind();
    let id = entity.id();
    match EntityKind::ALL
        .into_iter()
        .find(|&other| other != kind && store.contains(other, id))
    {
        Some(other) => Err(KnowledgeError::Import(format!(
            "{} {:?}: id already used by a {}",
            kind, id, other
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_types::{Category, FormulaVariable, NewDocument, NewFormula};

    fn base() -> ContentStore {
        let mut store = ContentStore::new();
        store
            .put_formula(
                NewFormula::new("Asphalt Tonnage", "Tons of mix", "calculations")
                    .into_formula("fml-1".to_string(), Utc::now()),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_capture_folds_usage() {
        let store = base();
        let tracker = AccessTracker::with_defaults();
        tracker.record_view(EntityKind::Formula, "fml-1");
        tracker.record_view(EntityKind::Formula, "fml-1");

        let snapshot = capture(&store, &tracker);
        assert_eq!(snapshot.formulas[0].meta.access_count, 2);
        assert!(snapshot.formulas[0].meta.last_accessed.is_some());
        // The store itself is untouched
        assert_eq!(store.formulas()[0].meta.access_count, 0);
    }

    #[test]
    fn test_stage_upserts_into_copy() {
        let base = base();
        let mut snapshot = Snapshot::empty();
        snapshot
            .categories
            .push(Category::new("regulations", "Regulations"));
        snapshot.formulas.push(
            NewFormula::new("Asphalt Tonnage v2", "Tons of mix", "calculations")
                .into_formula("fml-1".to_string(), Utc::now()),
        );
        snapshot.documents.push(
            NewDocument::new("ADA Ramps", "Slope limits", "regulations")
                .into_document("doc-1".to_string(), Utc::now()),
        );

        let staged = stage(&base, snapshot).unwrap();

        assert_eq!(staged.count(), 2);
        assert_eq!(staged.store.formulas()[0].name, "Asphalt Tonnage v2");
        assert_eq!(staged.store.len(), 2);
        assert_eq!(staged.store.categories().len(), 1);
        assert_eq!(base.formulas()[0].name, "Asphalt Tonnage");
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_stage_rejects_invalid_entity() {
        let mut snapshot = Snapshot::empty();
        snapshot.documents.push(
            NewDocument::new("Good", "Fine", "guides").into_document("doc-1".to_string(), Utc::now()),
        );
        snapshot.documents.push(
            NewDocument::new("   ", "No title", "guides")
                .into_document("doc-2".to_string(), Utc::now()),
        );

        let err = stage(&base(), snapshot).err().unwrap();
        match err {
            KnowledgeError::Import(msg) => assert!(msg.contains("doc-2"), "{}", msg),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stage_rejects_empty_id_and_category() {
        let mut snapshot = Snapshot::empty();
        snapshot.formulas.push(
            NewFormula::new("Name", "Desc", "calculations").into_formula(String::new(), Utc::now()),
        );
        assert!(matches!(
            stage(&base(), snapshot),
            Err(KnowledgeError::Import(_))
        ));

        let mut snapshot = Snapshot::empty();
        snapshot.formulas.push(
            NewFormula::new("Name", "Desc", " ").into_formula("fml-9".to_string(), Utc::now()),
        );
        assert!(matches!(
            stage(&base(), snapshot),
            Err(KnowledgeError::Import(_))
        ));
    }

    #[test]
    fn test_stage_rejects_unknown_version() {
        let mut snapshot = Snapshot::empty();
        snapshot.format_version = "3.1".to_string();
        assert!(matches!(
            stage(&base(), snapshot),
            Err(KnowledgeError::Import(_))
        ));
    }

    #[test]
    fn test_stage_rejects_id_held_by_other_kind_in_base() {
        let mut snapshot = Snapshot::empty();
        snapshot.documents.push(
            NewDocument::new("Tonnage Guide", "Tons of mix", "guides")
                .into_document("fml-1".to_string(), Utc::now()),
        );

        match stage(&base(), snapshot) {
            Err(KnowledgeError::Import(msg)) => assert!(msg.contains("formula"), "{}", msg),
            other => panic!("unexpected outcome: {:?}", other.map(|s| s.count())),
        }
    }

    #[test]
    fn test_stage_rejects_id_shared_across_kinds_in_snapshot() {
        let mut snapshot = Snapshot::empty();
        snapshot.formulas.push(
            NewFormula::new("Shared", "First kind", "calculations")
                .into_formula("shared".to_string(), Utc::now()),
        );
        snapshot.documents.push(
            NewDocument::new("Shared", "Second kind", "guides")
                .into_document("shared".to_string(), Utc::now()),
        );

        assert!(matches!(
            stage(&ContentStore::new(), snapshot),
            Err(KnowledgeError::Import(_))
        ));
    }

    #[test]
    fn test_repeated_id_within_kind_counted_once() {
        let mut snapshot = Snapshot::empty();
        for name in ["Striping v1", "Striping v2"] {
            snapshot.formulas.push(
                NewFormula::new(name, "Line feet", "calculations")
                    .into_formula("x".to_string(), Utc::now()),
            );
        }

        let staged = stage(&ContentStore::new(), snapshot).unwrap();
        assert_eq!(staged.count(), 1);
        assert_eq!(staged.store.len(), 1);
        assert_eq!(staged.store.formulas()[0].name, "Striping v2");
    }

    #[test]
    fn test_stage_applies_draft_rules() {
        let mut snapshot = Snapshot::empty();
        snapshot.formulas.push(
            NewFormula::new("Tonnage", "Tons of mix", "calculations")
                .with_variable(FormulaVariable::new(" ", "Area"))
                .into_formula("fml-2".to_string(), Utc::now()),
        );

        match stage(&base(), snapshot) {
            Err(KnowledgeError::Import(msg)) => {
                assert!(msg.contains("fml-2") && msg.contains("formula variable"), "{}", msg)
            }
            other => panic!("unexpected outcome: {:?}", other.map(|s| s.count())),
        }
    }
}
