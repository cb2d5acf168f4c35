//! Query execution over a content store.
//!
//! Every candidate is scored by direct field scan (the inverted index is only
//! token-exact, while scoring matches substrings). Results are sorted by
//! descending score, ties broken by ascending id, then annotated.

use std::cmp::Ordering;

use knowledge_store::ContentStore;
use knowledge_types::{Entity, EntityKind, SearchQuery, SearchResult, Searchable, Settings};
use tracing::debug;

use crate::highlight::highlights;
use crate::matched::matched_fields;
use crate::scorer::Scorer;
use crate::tokenize::query_terms;

/// Default cap on highlights per result.
pub const DEFAULT_MAX_HIGHLIGHTS: usize = 3;

/// Runs [`SearchQuery`]s against a [`ContentStore`].
#[derive(Debug, Clone)]
pub struct Searcher {
    scorer: Scorer,
    max_highlights: usize,
}

impl Default for Searcher {
    fn default() -> Self {
        Self {
            scorer: Scorer::default(),
            max_highlights: DEFAULT_MAX_HIGHLIGHTS,
        }
    }
}

impl Searcher {
    pub fn new(scorer: Scorer, max_highlights: usize) -> Self {
        Self {
            scorer,
            max_highlights,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Scorer::new(settings.scoring.clone()),
            settings.max_highlights,
        )
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Ranked results for the query. Never fails; no match yields an empty list.
    pub fn search(&self, store: &ContentStore, query: &SearchQuery) -> Vec<SearchResult> {
        let terms = query_terms(&query.text);
        if terms.is_empty() {
            return Vec::new();
        }

        let candidates = match query.kind {
            Some(kind) => store.searchables(kind),
            None => store.all_searchables(),
        };
        let scanned = candidates.len();

        let mut scored: Vec<(&dyn Searchable, f32)> = candidates
            .into_iter()
            .filter_map(|entity| {
                let score = self.scorer.score(entity, &terms, query);
                (score > 0.0).then_some((entity, score))
            })
            .collect();

        scored.sort_by(|(a, a_score), (b, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id().cmp(b.id()))
        });

        if let Some(limit) = query.limit {
            scored.truncate(limit);
        }

        let results: Vec<SearchResult> = scored
            .into_iter()
            .filter_map(|(entity, score)| {
                let full = store.get(entity.kind(), entity.id()).ok()?;
                Some(self.annotate(full, score, &terms))
            })
            .collect();

        debug!(
            query = %query.text,
            terms = terms.len(),
            scanned,
            results = results.len(),
            "Scored query"
        );

        results
    }

    fn annotate(&self, entity: Entity, score: f32, terms: &[String]) -> SearchResult {
        let matched = matched_fields(&entity, terms);
        let highlights = highlights(entity.long_text(), terms, self.max_highlights);
        let kind: EntityKind = entity.kind();
        SearchResult {
            entity,
            kind,
            relevance_score: score,
            matched_fields: matched,
            highlights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use knowledge_types::{NewCalculation, NewDocument, NewFormula, PrimaryField};
    use pretty_assertions::assert_eq;

    fn store() -> ContentStore {
        let mut store = ContentStore::new();
        store
            .put_formula(
                NewFormula::new(
                    "Asphalt Tonnage Calculation",
                    "Calculate the amount of asphalt needed for a paving project",
                    "calculations",
                )
                .with_tags(["asphalt", "paving"])
                .into_formula("fml-1".to_string(), Utc::now()),
            )
            .unwrap();
        store
            .put_calculation(
                NewCalculation::new("Sealcoat Estimator", "Gallons of sealer", "calculations")
                    .into_calculation("calc-1".to_string(), Utc::now()),
            )
            .unwrap();
        store
            .put_document(
                NewDocument::new(
                    "Asphalt Paving Specification",
                    "Placement rules",
                    "specifications",
                )
                .with_content(
                    "Asphalt must arrive hot. Surface tolerance: ±0.02 feet from grade. \
                     Tolerance checks happen daily. Record every tolerance reading. \
                     Report tolerance failures.",
                )
                .into_document("doc-1".to_string(), Utc::now()),
            )
            .unwrap();
        store
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_results_sorted_by_score() {
        let results = Searcher::default().search(&store(), &SearchQuery::new("asphalt"));

        assert_eq!(ids(&results), vec!["fml-1", "doc-1"]);
        assert!(results[0].relevance_score > results[1].relevance_score);
        assert_eq!(
            results[0].matched_fields,
            vec![PrimaryField::Name, PrimaryField::Description]
        );
    }

    #[test]
    fn test_ties_broken_by_ascending_id() {
        let mut store = ContentStore::new();
        for id in ["fml-b", "fml-c", "fml-a"] {
            store
                .put_formula(
                    NewFormula::new("Striping", "Line layout", "calculations")
                        .into_formula(id.to_string(), Utc::now()),
                )
                .unwrap();
        }

        let results = Searcher::default().search(&store, &SearchQuery::new("striping"));
        assert_eq!(ids(&results), vec!["fml-a", "fml-b", "fml-c"]);
    }

    #[test]
    fn test_category_filter_excludes_matches() {
        let query = SearchQuery::new("asphalt").with_category("regulations");
        assert!(Searcher::default().search(&store(), &query).is_empty());

        let query = SearchQuery::new("asphalt").with_category("specifications");
        assert_eq!(ids(&Searcher::default().search(&store(), &query)), vec!["doc-1"]);
    }

    #[test]
    fn test_kind_filter() {
        let query = SearchQuery::new("asphalt").with_kind(EntityKind::Document);
        let results = Searcher::default().search(&store(), &query);
        assert_eq!(ids(&results), vec!["doc-1"]);
        assert_eq!(results[0].kind, EntityKind::Document);
    }

    #[test]
    fn test_highlights_capped_at_three() {
        let results = Searcher::default().search(&store(), &SearchQuery::new("tolerance"));

        assert_eq!(ids(&results), vec!["doc-1"]);
        let highlights = &results[0].highlights;
        assert_eq!(highlights.len(), 3);
        assert_eq!(highlights[0], "Surface tolerance: ±0.02 feet from grade.");
    }

    #[test]
    fn test_non_documents_have_no_highlights() {
        let results = Searcher::default().search(&store(), &SearchQuery::new("sealcoat"));
        assert_eq!(ids(&results), vec!["calc-1"]);
        assert!(results[0].highlights.is_empty());
    }

    #[test]
    fn test_limit_truncates_after_sorting() {
        let query = SearchQuery::new("asphalt").with_limit(1);
        assert_eq!(ids(&Searcher::default().search(&store(), &query)), vec!["fml-1"]);
    }

    #[test]
    fn test_empty_and_unmatched_queries() {
        let searcher = Searcher::default();
        assert!(searcher.search(&store(), &SearchQuery::new("")).is_empty());
        assert!(searcher.search(&store(), &SearchQuery::new("concrete")).is_empty());
        assert!(searcher
            .search(&ContentStore::new(), &SearchQuery::new("asphalt"))
            .is_empty());
    }

    #[test]
    fn test_max_highlights_from_settings() {
        let settings = Settings {
            max_highlights: 1,
            ..Default::default()
        };
        let results =
            Searcher::from_settings(&settings).search(&store(), &SearchQuery::new("tolerance"));
        assert_eq!(results[0].highlights.len(), 1);
    }
}
