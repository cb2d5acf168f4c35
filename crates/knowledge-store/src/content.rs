//! Content store: every category and entity, partitioned by kind.
//!
//! Each partition keeps insertion order. Overwriting an id replaces the value
//! in place, so the entity keeps its original position in `list`.

use std::collections::{BTreeMap, HashMap};

use knowledge_types::{
    Calculation, Category, Dataset, Document, Entity, EntityKind, Formula, Searchable,
};
use tracing::debug;

use crate::error::StoreError;

/// Anything stored under a string id.
pub trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! impl_keyed {
    ($($ty:ty),*) => {
        $(
            impl Keyed for $ty {
                fn key(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

impl_keyed!(Category, Formula, Calculation, Document, Dataset);

/// Insertion-ordered map from id to value.
#[derive(Debug, Clone)]
pub struct Partition<T> {
    items: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Default for Partition<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T: Keyed> Partition<T> {
    /// Insert or overwrite. Returns true if an existing value was replaced.
    pub fn put(&mut self, item: T) -> bool {
        match self.positions.get(item.key()) {
            Some(&pos) => {
                self.items[pos] = item;
                true
            }
            None => {
                self.positions.insert(item.key().to_string(), self.items.len());
                self.items.push(item);
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.positions.get(id).map(|&pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        match self.positions.get(id) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Values in insertion order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn require_id(id: &str, what: &str) -> Result<(), StoreError> {
    if id.trim().is_empty() {
        return Err(StoreError::EmptyId(what.to_string()));
    }
    Ok(())
}

/// Owns all knowledge base content. Pure data ownership, no indexing.
///
/// Cloning is a deep copy; the engine uses that to stage writes off to the
/// side before swapping them in.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    categories: Partition<Category>,
    formulas: Partition<Formula>,
    calculations: Partition<Calculation>,
    documents: Partition<Document>,
    datasets: Partition<Dataset>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entity by id within its kind's partition.
    pub fn put(&mut self, entity: Entity) -> Result<(), StoreError> {
        match entity {
            Entity::Formula(f) => self.put_formula(f),
            Entity::Calculation(c) => self.put_calculation(c),
            Entity::Document(d) => self.put_document(d),
            Entity::Dataset(d) => self.put_dataset(d),
        }
    }

    pub fn put_category(&mut self, category: Category) -> Result<(), StoreError> {
        require_id(&category.id, "category")?;
        debug!(id = %category.id, "Storing category");
        self.categories.put(category);
        Ok(())
    }

    pub fn put_formula(&mut self, formula: Formula) -> Result<(), StoreError> {
        require_id(&formula.id, EntityKind::Formula.as_str())?;
        debug!(id = %formula.id, kind = "formula", "Storing entity");
        self.formulas.put(formula);
        Ok(())
    }

    pub fn put_calculation(&mut self, calculation: Calculation) -> Result<(), StoreError> {
        require_id(&calculation.id, EntityKind::Calculation.as_str())?;
        debug!(id = %calculation.id, kind = "calculation", "Storing entity");
        self.calculations.put(calculation);
        Ok(())
    }

    pub fn put_document(&mut self, document: Document) -> Result<(), StoreError> {
        require_id(&document.id, EntityKind::Document.as_str())?;
        debug!(id = %document.id, kind = "document", "Storing entity");
        self.documents.put(document);
        Ok(())
    }

    pub fn put_dataset(&mut self, dataset: Dataset) -> Result<(), StoreError> {
        require_id(&dataset.id, EntityKind::Dataset.as_str())?;
        debug!(id = %dataset.id, kind = "dataset", "Storing entity");
        self.datasets.put(dataset);
        Ok(())
    }

    /// Fetch a copy of an entity.
    pub fn get(&self, kind: EntityKind, id: &str) -> Result<Entity, StoreError> {
        let found = match kind {
            EntityKind::Formula => self.formulas.get(id).cloned().map(Entity::Formula),
            EntityKind::Calculation => self.calculations.get(id).cloned().map(Entity::Calculation),
            EntityKind::Document => self.documents.get(id).cloned().map(Entity::Document),
            EntityKind::Dataset => self.datasets.get(id).cloned().map(Entity::Dataset),
        };
        found.ok_or_else(|| StoreError::NotFound {
            kind,
            id: id.to_string(),
        })
    }

    /// Look an id up across every kind.
    pub fn find(&self, id: &str) -> Option<Entity> {
        EntityKind::ALL
            .iter()
            .find_map(|&kind| self.get(kind, id).ok())
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        match kind {
            EntityKind::Formula => self.formulas.contains(id),
            EntityKind::Calculation => self.calculations.contains(id),
            EntityKind::Document => self.documents.contains(id),
            EntityKind::Dataset => self.datasets.contains(id),
        }
    }

    /// Copies of every entity of a kind, in insertion order.
    pub fn list(&self, kind: EntityKind) -> Vec<Entity> {
        match kind {
            EntityKind::Formula => self.formulas.iter().cloned().map(Entity::Formula).collect(),
            EntityKind::Calculation => self
                .calculations
                .iter()
                .cloned()
                .map(Entity::Calculation)
                .collect(),
            EntityKind::Document => self.documents.iter().cloned().map(Entity::Document).collect(),
            EntityKind::Dataset => self.datasets.iter().cloned().map(Entity::Dataset).collect(),
        }
    }

    /// Borrowed retrieval views over one kind, in insertion order.
    pub fn searchables(&self, kind: EntityKind) -> Vec<&dyn Searchable> {
        match kind {
            EntityKind::Formula => self.formulas.iter().map(|e| e as &dyn Searchable).collect(),
            EntityKind::Calculation => self
                .calculations
                .iter()
                .map(|e| e as &dyn Searchable)
                .collect(),
            EntityKind::Document => self.documents.iter().map(|e| e as &dyn Searchable).collect(),
            EntityKind::Dataset => self.datasets.iter().map(|e| e as &dyn Searchable).collect(),
        }
    }

    /// Borrowed retrieval views over every kind.
    pub fn all_searchables(&self) -> Vec<&dyn Searchable> {
        EntityKind::ALL
            .iter()
            .flat_map(|&kind| self.searchables(kind))
            .collect()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn categories(&self) -> &[Category] {
        self.categories.as_slice()
    }

    pub fn formulas(&self) -> &[Formula] {
        self.formulas.as_slice()
    }

    pub fn calculations(&self) -> &[Calculation] {
        self.calculations.as_slice()
    }

    pub fn documents(&self) -> &[Document] {
        self.documents.as_slice()
    }

    pub fn datasets(&self) -> &[Dataset] {
        self.datasets.as_slice()
    }

    pub fn document_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documents.get_mut(id)
    }

    /// Number of entities of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Formula => self.formulas.len(),
            EntityKind::Calculation => self.calculations.len(),
            EntityKind::Document => self.documents.len(),
            EntityKind::Dataset => self.datasets.len(),
        }
    }

    /// Entity counts for every kind, including empty ones.
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        EntityKind::ALL
            .iter()
            .map(|&kind| (kind, self.count(kind)))
            .collect()
    }

    /// Total entities (categories excluded).
    pub fn len(&self) -> usize {
        EntityKind::ALL.iter().map(|&kind| self.count(kind)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use knowledge_types::{NewDocument, NewFormula};

    fn formula(id: &str, name: &str) -> Formula {
        NewFormula::new(name, "Estimate material", "calculations")
            .into_formula(id.to_string(), Utc::now())
    }

    fn document(id: &str, title: &str) -> Document {
        NewDocument::new(title, "Field guide", "specifications")
            .into_document(id.to_string(), Utc::now())
    }

    #[test]
    fn test_put_and_get() {
        let mut store = ContentStore::new();
        store.put_formula(formula("fml-1", "Asphalt Tonnage")).unwrap();

        let entity = store.get(EntityKind::Formula, "fml-1").unwrap();
        assert_eq!(entity.id(), "fml-1");
        assert_eq!(entity.kind(), EntityKind::Formula);
        assert!(store.contains(EntityKind::Formula, "fml-1"));
    }

    #[test]
    fn test_get_wrong_kind_is_not_found() {
        let mut store = ContentStore::new();
        store.put_formula(formula("fml-1", "Asphalt Tonnage")).unwrap();

        let err = store.get(EntityKind::Document, "fml-1").unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: EntityKind::Document,
                id: "fml-1".to_string()
            }
        );
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut store = ContentStore::new();
        let err = store.put_formula(formula("  ", "Blank")).unwrap_err();
        assert!(matches!(err, StoreError::EmptyId(_)));
        assert!(store.is_empty());

        let err = store.put_category(Category::new("", "Nameless")).unwrap_err();
        assert!(matches!(err, StoreError::EmptyId(_)));
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let mut store = ContentStore::new();
        for id in ["doc-c", "doc-a", "doc-b"] {
            store.put_document(document(id, id)).unwrap();
        }

        let ids: Vec<String> = store
            .list(EntityKind::Document)
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec!["doc-c", "doc-a", "doc-b"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut store = ContentStore::new();
        store.put_document(document("doc-1", "First")).unwrap();
        store.put_document(document("doc-2", "Second")).unwrap();
        store.put_document(document("doc-1", "Replaced")).unwrap();

        assert_eq!(store.count(EntityKind::Document), 2);
        assert_eq!(store.documents()[0].title, "Replaced");
        assert_eq!(store.documents()[1].title, "Second");
    }

    #[test]
    fn test_find_across_kinds() {
        let mut store = ContentStore::new();
        store.put_formula(formula("fml-1", "Sealcoat Coverage")).unwrap();
        store.put_document(document("doc-1", "Crack Repair")).unwrap();

        assert_eq!(store.find("doc-1").unwrap().kind(), EntityKind::Document);
        assert!(store.find("missing").is_none());
    }

    #[test]
    fn test_counts_include_empty_kinds() {
        let mut store = ContentStore::new();
        store.put(Entity::from(formula("fml-1", "A"))).unwrap();
        store.put(Entity::from(document("doc-1", "B"))).unwrap();

        let counts = store.counts();
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[&EntityKind::Formula], 1);
        assert_eq!(counts[&EntityKind::Dataset], 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.all_searchables().len(), 2);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut store = ContentStore::new();
        store.put_document(document("doc-1", "Original")).unwrap();

        let mut staged = store.clone();
        staged.put_document(document("doc-2", "Staged")).unwrap();
        if let Some(doc) = staged.document_mut("doc-1") {
            doc.title = "Edited".to_string();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.documents()[0].title, "Original");
        assert_eq!(staged.len(), 2);
    }

    #[test]
    fn test_categories() {
        let mut store = ContentStore::new();
        store
            .put_category(Category::new("calculations", "Calculations"))
            .unwrap();
        store
            .put_category(Category::new("regulations", "Regulations"))
            .unwrap();

        assert_eq!(store.categories().len(), 2);
        assert_eq!(store.category("regulations").unwrap().name, "Regulations");
        assert!(store.category("missing").is_none());
        assert!(store.is_empty());
    }
}
