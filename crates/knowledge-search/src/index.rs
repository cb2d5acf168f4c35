//! Inverted index over the content store.
//!
//! Maps every token of every searchable field (name/title, description,
//! content, tags and formula variables) to the ids containing it, partitioned
//! by kind. The index is a pure function of the store: it is always built
//! from scratch and never patched in place.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use knowledge_store::ContentStore;
use knowledge_types::{EntityKind, Searchable};
use tracing::debug;

use crate::tokenize::tokenize;

/// Ids containing one token, by kind.
pub type Postings = BTreeMap<EntityKind, BTreeSet<String>>;

/// Size summary of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Distinct tokens
    pub tokens: usize,
    /// Total (token, id) pairs
    pub postings: usize,
}

/// token -> kind -> ids
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Postings>,
}

impl InvertedIndex {
    /// An index with no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete index for the store's current contents.
    pub fn build(store: &ContentStore) -> Self {
        let mut index = Self::new();
        for entity in store.all_searchables() {
            index.add_entity(entity);
        }
        debug!(
            entities = store.len(),
            tokens = index.postings.len(),
            "Built inverted index"
        );
        index
    }

    fn add_entity(&mut self, entity: &dyn Searchable) {
        let kind = entity.kind();
        let id = entity.id();

        let fields = entity
            .primary_fields()
            .into_iter()
            .map(|(_, text)| text)
            .chain(entity.tags().iter().map(String::as_str))
            .chain(entity.indexed_extras());

        for text in fields {
            for token in tokenize(text) {
                self.postings
                    .entry(token)
                    .or_default()
                    .entry(kind)
                    .or_default()
                    .insert(id.to_string());
            }
        }
    }

    /// Postings for a token. The token is lower-cased before lookup.
    pub fn lookup(&self, token: &str) -> Option<&Postings> {
        self.postings.get(&token.to_lowercase())
    }

    /// Ids of one kind containing a token.
    pub fn ids(&self, token: &str, kind: EntityKind) -> Vec<&str> {
        self.lookup(token)
            .and_then(|postings| postings.get(&kind))
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.lookup(token).is_some()
    }

    /// Distinct tokens indexed.
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            tokens: self.postings.len(),
            postings: self
                .postings
                .values()
                .flat_map(|by_kind| by_kind.values())
                .map(BTreeSet::len)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use knowledge_types::{FormulaVariable, NewDocument, NewFormula};

    fn seeded_store() -> ContentStore {
        let mut store = ContentStore::new();
        store
            .put_formula(
                NewFormula::new(
                    "Asphalt Tonnage",
                    "Calculate asphalt needed for paving",
                    "calculations",
                )
                .with_tags(["Paving"])
                .with_variable(FormulaVariable::new("depth", "Compacted thickness"))
                .into_formula("fml-1".to_string(), Utc::now()),
            )
            .unwrap();
        store
            .put_document(
                NewDocument::new("Sealcoat Spec", "Sealcoat application", "specifications")
                    .with_content("Apply two coats. Surface tolerance: ±0.02 feet from grade.")
                    .into_document("doc-1".to_string(), Utc::now()),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_indexes_primary_fields_tags_and_variables() {
        let index = InvertedIndex::build(&seeded_store());

        assert_eq!(index.ids("asphalt", EntityKind::Formula), vec!["fml-1"]);
        assert_eq!(index.ids("paving", EntityKind::Formula), vec!["fml-1"]);
        assert_eq!(index.ids("thickness", EntityKind::Formula), vec!["fml-1"]);
        assert_eq!(index.ids("tolerance:", EntityKind::Document), vec!["doc-1"]);
        assert!(index.ids("asphalt", EntityKind::Document).is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive_but_punctuation_sensitive() {
        let index = InvertedIndex::build(&seeded_store());

        assert!(index.contains_token("SEALCOAT"));
        assert!(index.contains_token("grade."));
        assert!(!index.contains_token("grade"));
    }

    #[test]
    fn test_token_shared_across_kinds() {
        let mut store = seeded_store();
        store
            .put_document(
                NewDocument::new("Asphalt Handbook", "Mix design", "guides")
                    .into_document("doc-2".to_string(), Utc::now()),
            )
            .unwrap();
        let index = InvertedIndex::build(&store);

        let postings = index.lookup("asphalt").unwrap();
        assert_eq!(postings.len(), 2);
        assert!(postings[&EntityKind::Formula].contains("fml-1"));
        assert!(postings[&EntityKind::Document].contains("doc-2"));
    }

    #[test]
    fn test_rebuild_drops_stale_tokens() {
        let mut store = seeded_store();
        let before = InvertedIndex::build(&store);
        assert!(before.contains_token("sealcoat"));

        if let Some(doc) = store.document_mut("doc-1") {
            doc.title = "Crack Filling".to_string();
            doc.description = "Hot pour".to_string();
            doc.content = None;
        }
        let after = InvertedIndex::build(&store);

        assert!(!after.contains_token("sealcoat"));
        assert!(after.contains_token("crack"));
    }

    #[test]
    fn test_empty_store() {
        let index = InvertedIndex::build(&ContentStore::new());
        assert!(index.is_empty());
        assert_eq!(index.stats(), IndexStats::default());
    }
}
