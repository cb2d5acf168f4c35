//! The retrieval engine facade.
//!
//! State (content store plus inverted index) lives behind an
//! `RwLock<Arc<EngineState>>`. Readers clone the `Arc` and release the lock
//! immediately. Writers take the write gate, build a complete new state off to
//! the side, then swap the pointer. Observers run after every lock is
//! released.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use knowledge_search::{IndexStats, InvertedIndex, Postings, Searcher};
use knowledge_store::{AccessTracker, ContentStore};
use knowledge_types::{
    AccessEvent, AccessKind, Calculation, Category, Dataset, Document, DocumentPatch, Entity,
    EntityKind, Formula, KnowledgeError, NewCalculation, NewDataset, NewDocument, NewFormula,
    SearchQuery, SearchResult, Searchable, Settings, Snapshot,
};
use serde::Serialize;
use tracing::{info, warn};
use ulid::{Generator, Ulid};

use crate::events::{EngineEvent, EngineObserver, ObserverRegistry, SubscriptionId};
use crate::snapshot;

/// One consistent view of the knowledge base.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    store: ContentStore,
    index: Arc<InvertedIndex>,
}

impl EngineState {
    fn indexed(store: ContentStore) -> Self {
        let index = Arc::new(InvertedIndex::build(&store));
        Self { store, index }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }
}

/// Size summary of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub entities: BTreeMap<EntityKind, usize>,
    pub categories: usize,
    pub tokens: usize,
    pub postings: usize,
    pub access_log_len: usize,
}

impl EngineStats {
    pub fn total_entities(&self) -> usize {
        self.entities.values().sum()
    }
}

/// In-memory knowledge retrieval engine.
pub struct RetrievalEngine {
    state: RwLock<Arc<EngineState>>,
    write_gate: Mutex<()>,
    tracker: AccessTracker,
    searcher: Searcher,
    observers: ObserverRegistry,
    ids: Mutex<Generator>,
    recent_limit: usize,
}

impl Default for RetrievalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrievalEngine {
    /// Empty engine with default settings.
    pub fn new() -> Self {
        Self::with_settings(&Settings::default())
    }

    pub fn with_settings(settings: &Settings) -> Self {
        Self {
            state: RwLock::new(Arc::new(EngineState::default())),
            write_gate: Mutex::new(()),
            tracker: AccessTracker::new(settings.access_log_capacity),
            searcher: Searcher::from_settings(settings),
            observers: ObserverRegistry::new(),
            ids: Mutex::new(Generator::new()),
            recent_limit: settings.recent_access_limit,
        }
    }

    /// The current published state. Holds no lock after returning.
    pub fn current(&self) -> Arc<EngineState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply a mutation to a copy of the store and publish it.
    ///
    /// With `reindex` false the new state shares the previous index, which is
    /// only correct when no indexed text changed.
    fn commit<T, F>(&self, reindex: bool, mutate: F) -> Result<T, KnowledgeError>
    where
        F: FnOnce(&mut ContentStore) -> Result<T, KnowledgeError>,
    {
        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.current();
        let mut store = current.store.clone();
        let value = mutate(&mut store)?;

        let next = if reindex {
            EngineState::indexed(store)
        } else {
            EngineState {
                store,
                index: Arc::clone(&current.index),
            }
        };
        self.publish(next);
        Ok(value)
    }

    fn publish(&self, next: EngineState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    fn next_id(&self, kind: EntityKind) -> String {
        let ulid = self
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .unwrap_or_else(|_| Ulid::new());
        format!("{}-{}", kind.id_prefix(), ulid)
    }

    fn with_usage<T: Searchable>(&self, mut entity: T) -> T {
        self.tracker
            .usage(entity.kind(), entity.id())
            .fold_into(entity.meta_mut());
        entity
    }

    fn insert(&self, entity: Entity) -> Result<String, KnowledgeError> {
        let kind = entity.kind();
        let id = entity.id().to_string();
        self.commit(true, |store| Ok(store.put(entity)?))?;

        info!(kind = kind.as_str(), id = %id, "Added entity");
        self.observers.notify(&EngineEvent::EntityAdded {
            kind,
            id: id.clone(),
        });
        Ok(id)
    }

    // ===== Query =====

    /// Ranked results for the query. Never fails.
    ///
    /// Non-blank query text is recorded in the access log.
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let state = self.current();
        let mut results = self.searcher.search(&state.store, query);
        for result in &mut results {
            self.tracker
                .usage(result.kind, result.entity.id())
                .fold_into(result.entity.meta_mut());
        }

        if !query.text.trim().is_empty() {
            self.tracker.record_access(&query.text, AccessKind::Search);
        }

        info!(
            query = %query.text,
            kind = query.kind.map(|k| k.as_str()),
            category = query.category.as_deref(),
            results = results.len(),
            "Search"
        );
        results
    }

    /// Postings for one index token.
    pub fn lookup_token(&self, token: &str) -> Option<Postings> {
        self.current().index.lookup(token).cloned()
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.current();
        let IndexStats { tokens, postings } = state.index.stats();
        EngineStats {
            entities: state.store.counts(),
            categories: state.store.categories().len(),
            tokens,
            postings,
            access_log_len: self.tracker.len(),
        }
    }

    // ===== Add =====

    pub fn add_formula(&self, draft: NewFormula) -> Result<String, KnowledgeError> {
        draft.validate()?;
        let id = self.next_id(EntityKind::Formula);
        self.insert(draft.into_formula(id, Utc::now()).into())
    }

    pub fn add_calculation(&self, draft: NewCalculation) -> Result<String, KnowledgeError> {
        draft.validate()?;
        let id = self.next_id(EntityKind::Calculation);
        self.insert(draft.into_calculation(id, Utc::now()).into())
    }

    pub fn add_document(&self, draft: NewDocument) -> Result<String, KnowledgeError> {
        draft.validate()?;
        let id = self.next_id(EntityKind::Document);
        self.insert(draft.into_document(id, Utc::now()).into())
    }

    pub fn add_dataset(&self, draft: NewDataset) -> Result<String, KnowledgeError> {
        draft.validate()?;
        let id = self.next_id(EntityKind::Dataset);
        self.insert(draft.into_dataset(id, Utc::now()).into())
    }

    /// Insert or replace a category. Categories are not indexed.
    pub fn add_category(&self, category: Category) -> Result<(), KnowledgeError> {
        if category.name.trim().is_empty() {
            return Err(KnowledgeError::Validation(
                "category name must not be empty".to_string(),
            ));
        }
        let id = category.id.clone();
        self.commit(false, |store| Ok(store.put_category(category)?))?;
        info!(id = %id, "Stored category");
        Ok(())
    }

    // ===== Get =====

    /// Fetch any entity, counting the view.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Entity> {
        let entity = self.current().store.get(kind, id).ok()?;
        self.tracker.record_view(kind, id);
        Some(self.with_usage(entity))
    }

    /// Fetch by id without knowing the kind, counting the view.
    pub fn find(&self, id: &str) -> Option<Entity> {
        let entity = self.current().store.find(id)?;
        self.tracker.record_view(entity.kind(), id);
        Some(self.with_usage(entity))
    }

    pub fn get_formula(&self, id: &str) -> Option<Formula> {
        match self.get(EntityKind::Formula, id)? {
            Entity::Formula(formula) => Some(formula),
            _ => None,
        }
    }

    pub fn get_calculation(&self, id: &str) -> Option<Calculation> {
        match self.get(EntityKind::Calculation, id)? {
            Entity::Calculation(calculation) => Some(calculation),
            _ => None,
        }
    }

    pub fn get_document(&self, id: &str) -> Option<Document> {
        match self.get(EntityKind::Document, id)? {
            Entity::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn get_dataset(&self, id: &str) -> Option<Dataset> {
        match self.get(EntityKind::Dataset, id)? {
            Entity::Dataset(dataset) => Some(dataset),
            _ => None,
        }
    }

    pub fn get_category(&self, id: &str) -> Option<Category> {
        self.current().store.category(id).cloned()
    }

    // ===== List =====

    /// Every entity of a kind in insertion order. Views are not counted.
    pub fn list(&self, kind: EntityKind) -> Vec<Entity> {
        self.current()
            .store
            .list(kind)
            .into_iter()
            .map(|entity| self.with_usage(entity))
            .collect()
    }

    pub fn list_formulas(&self) -> Vec<Formula> {
        self.list_of(|store| store.formulas().to_vec())
    }

    pub fn list_calculations(&self) -> Vec<Calculation> {
        self.list_of(|store| store.calculations().to_vec())
    }

    pub fn list_documents(&self) -> Vec<Document> {
        self.list_of(|store| store.documents().to_vec())
    }

    pub fn list_datasets(&self) -> Vec<Dataset> {
        self.list_of(|store| store.datasets().to_vec())
    }

    fn list_of<T: Searchable>(&self, items: impl FnOnce(&ContentStore) -> Vec<T>) -> Vec<T> {
        items(&self.current().store)
            .into_iter()
            .map(|item| self.with_usage(item))
            .collect()
    }

    pub fn list_categories(&self) -> Vec<Category> {
        self.current().store.categories().to_vec()
    }

    // ===== Access log =====

    /// The most recent accesses, up to the configured limit (10 by default).
    pub fn recently_accessed(&self) -> Vec<AccessEvent> {
        self.tracker.recent(self.recent_limit)
    }

    pub fn recent_accesses(&self, n: usize) -> Vec<AccessEvent> {
        self.tracker.recent(n)
    }

    // ===== Update =====

    /// Apply a field patch to a document. Reindexes when text changed.
    pub fn update_document(
        &self,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<Document, KnowledgeError> {
        patch.validate()?;
        let reindex = patch.touches_text();
        let updated = self.commit(reindex, |store| {
            let document = store
                .document_mut(id)
                .ok_or_else(|| KnowledgeError::not_found(EntityKind::Document, id))?;
            patch.apply(document);
            Ok(document.clone())
        })?;

        info!(id, reindexed = reindex, "Updated document");
        self.observers.notify(&EngineEvent::EntityUpdated {
            kind: EntityKind::Document,
            id: id.to_string(),
        });
        Ok(self.with_usage(updated))
    }

    /// Fold a 0-5 rating into a document's running average.
    pub fn rate_document(&self, id: &str, rating: f32) -> Result<Document, KnowledgeError> {
        if !(0.0..=5.0).contains(&rating) {
            return Err(KnowledgeError::Validation(format!(
                "rating must be between 0 and 5, got {}",
                rating
            )));
        }
        let updated = self.commit(false, |store| {
            let document = store
                .document_mut(id)
                .ok_or_else(|| KnowledgeError::not_found(EntityKind::Document, id))?;
            document.add_rating(rating);
            document.meta.touch();
            Ok(document.clone())
        })?;

        info!(id, rating, average = updated.rating, "Rated document");
        self.observers.notify(&EngineEvent::EntityUpdated {
            kind: EntityKind::Document,
            id: id.to_string(),
        });
        Ok(self.with_usage(updated))
    }

    // ===== Snapshots =====

    /// Every category and entity, with counted views folded in.
    pub fn export_snapshot(&self) -> Snapshot {
        snapshot::capture(&self.current().store, &self.tracker)
    }

    pub fn export_json(&self) -> Result<String, KnowledgeError> {
        self.export_snapshot().to_json()
    }

    /// Upsert every entity of the snapshot, all or nothing.
    ///
    /// On success the index is rebuilt once and `ImportCompleted` is emitted
    /// with the number of entities applied. On failure prior state is intact
    /// and `ImportFailed` is emitted.
    pub fn import_snapshot(&self, snapshot: Snapshot) -> Result<usize, KnowledgeError> {
        let outcome = self.apply_import(snapshot);
        self.report_import(outcome)
    }

    /// Parse and import a JSON snapshot. Malformed JSON counts as a failed import.
    pub fn import_json(&self, json: &str) -> Result<usize, KnowledgeError> {
        let outcome = Snapshot::from_json(json).and_then(|snapshot| self.apply_import(snapshot));
        self.report_import(outcome)
    }

    fn apply_import(&self, snapshot: Snapshot) -> Result<usize, KnowledgeError> {
        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.current();
        let staged = snapshot::stage(&current.store, snapshot)?;
        let count = staged.count();
        let next = EngineState::indexed(staged.store);

        // Imported metadata already carries its access counts. Cleared before
        // publishing so views of the imported entities are never dropped.
        for (kind, id) in &staged.written {
            self.tracker.clear_usage(*kind, id);
        }
        self.publish(next);
        Ok(count)
    }

    fn report_import(
        &self,
        outcome: Result<usize, KnowledgeError>,
    ) -> Result<usize, KnowledgeError> {
        match &outcome {
            Ok(count) => {
                info!(count, "Import completed");
                self.observers
                    .notify(&EngineEvent::ImportCompleted { count: *count });
            }
            Err(e) => {
                warn!(error = %e, "Import rejected, state unchanged");
                self.observers.notify(&EngineEvent::ImportFailed {
                    error: e.to_string(),
                });
            }
        }
        outcome
    }

    // ===== Observers =====

    pub fn subscribe(&self, observer: Arc<dyn EngineObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn subscribe_fn<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(Arc::new(observer))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
