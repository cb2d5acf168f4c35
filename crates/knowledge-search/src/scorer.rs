//! Additive relevance scoring.
//!
//! Per entity: hard filters first, then for every primary field and every
//! query term either a flat exact-match award or an award per occurrence,
//! then a boost for every tag containing a term. A zero score means the
//! entity is not a result.

use knowledge_types::{ScoringSettings, SearchQuery, Searchable};

/// Scores entities against a tokenized query.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    settings: ScoringSettings,
}

impl Scorer {
    pub fn new(settings: ScoringSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    /// True if the entity passes every filter set on the query.
    pub fn passes_filters(&self, entity: &dyn Searchable, query: &SearchQuery) -> bool {
        if let Some(category) = &query.category {
            if entity.category() != category {
                return false;
            }
        }

        if let Some(kind) = query.kind {
            if entity.kind() != kind {
                return false;
            }
        }

        if !query.tags.is_empty() {
            let carries_any = query.tags.iter().any(|wanted| {
                let wanted = wanted.to_lowercase();
                entity.tags().iter().any(|tag| tag.to_lowercase() == wanted)
            });
            if !carries_any {
                return false;
            }
        }

        if !field_matches(entity.author(), query.author.as_deref()) {
            return false;
        }

        if !field_matches(entity.industry(), query.industry.as_deref()) {
            return false;
        }

        if let Some(range) = &query.date_range {
            if !range.contains(entity.meta().updated_at) {
                return false;
            }
        }

        true
    }

    /// Relevance of one entity. Zero when filtered out or nothing matched.
    pub fn score(&self, entity: &dyn Searchable, terms: &[String], query: &SearchQuery) -> f32 {
        if terms.is_empty() || !self.passes_filters(entity, query) {
            return 0.0;
        }

        let mut score = 0.0;

        for (_, text) in entity.primary_fields() {
            let field = text.to_lowercase();
            for term in terms {
                score += if query.exact_match {
                    if field.contains(term.as_str()) {
                        self.settings.exact_match_points
                    } else {
                        0.0
                    }
                } else {
                    field.matches(term.as_str()).count() as f32 * self.settings.occurrence_points
                };
            }
        }

        for tag in entity.tags() {
            let tag = tag.to_lowercase();
            for term in terms {
                if tag.contains(term.as_str()) {
                    score += self.settings.tag_points;
                }
            }
        }

        score
    }
}

/// Case-insensitive equality filter; entities lacking the field fail it.
fn field_matches(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => value.is_some_and(|v| v.to_lowercase() == wanted.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::query_terms;
    use chrono::{Duration, Utc};
    use knowledge_types::{DateRange, EntityKind, Formula, NewDocument, NewFormula};

    fn formula(description: &str, tags: &[&str]) -> Formula {
        NewFormula::new("Tonnage", description, "calculations")
            .with_tags(tags.iter().copied())
            .into_formula("fml-1".to_string(), Utc::now())
    }

    fn score(entity: &dyn Searchable, query: &SearchQuery) -> f32 {
        Scorer::default().score(entity, &query_terms(&query.text), query)
    }

    #[test]
    fn test_exact_mode_counts_term_once_per_field() {
        let entity = formula("asphalt base and asphalt surface", &[]);
        let query = SearchQuery::new("asphalt").with_exact_match(true);
        assert_eq!(score(&entity, &query), 10.0);
    }

    #[test]
    fn test_occurrence_mode_counts_every_occurrence() {
        let entity = formula("asphalt base and asphalt surface", &[]);
        let query = SearchQuery::new("asphalt");
        assert_eq!(score(&entity, &query), 10.0);

        let three = formula("Asphalt, asphalt and ASPHALT", &[]);
        assert_eq!(score(&three, &query), 15.0);
    }

    #[test]
    fn test_modes_diverge_across_fields() {
        let mut entity = formula("asphalt base and asphalt surface", &[]);
        entity.name = "Asphalt Tonnage".to_string();

        let exact = SearchQuery::new("asphalt").with_exact_match(true);
        let fuzzy = SearchQuery::new("asphalt");
        assert_eq!(score(&entity, &exact), 20.0);
        assert_eq!(score(&entity, &fuzzy), 15.0);
    }

    #[test]
    fn test_occurrences_do_not_overlap() {
        let entity = formula("aaaa", &[]);
        assert_eq!(score(&entity, &SearchQuery::new("aa")), 10.0);
    }

    #[test]
    fn test_tag_boost_is_fifteen_per_tag() {
        let plain = formula("Calculate asphalt", &[]);
        let tagged = formula("Calculate asphalt", &["asphalt"]);
        let query = SearchQuery::new("asphalt");

        assert_eq!(score(&tagged, &query) - score(&plain, &query), 15.0);

        let two_tags = formula("Calculate asphalt", &["asphalt", "Hot Asphalt Mix"]);
        assert_eq!(score(&two_tags, &query) - score(&plain, &query), 30.0);
    }

    #[test]
    fn test_tag_alone_scores() {
        let entity = formula("Material estimate", &["paving"]);
        assert_eq!(score(&entity, &SearchQuery::new("pav")), 15.0);
    }

    #[test]
    fn test_multiple_terms_add_up() {
        let entity = formula("sealcoat coverage per gallon", &[]);
        let query = SearchQuery::new("sealcoat gallon missing");
        assert_eq!(score(&entity, &query), 10.0);
    }

    #[test]
    fn test_blank_query_scores_zero() {
        let entity = formula("anything", &["anything"]);
        assert_eq!(score(&entity, &SearchQuery::new("  ")), 0.0);
    }

    #[test]
    fn test_category_and_kind_filters_exclude() {
        let entity = formula("asphalt", &["asphalt"]);

        let wrong_category = SearchQuery::new("asphalt").with_category("regulations");
        assert_eq!(score(&entity, &wrong_category), 0.0);

        let wrong_kind = SearchQuery::new("asphalt").with_kind(EntityKind::Document);
        assert_eq!(score(&entity, &wrong_kind), 0.0);

        let both_right = SearchQuery::new("asphalt")
            .with_category("calculations")
            .with_kind(EntityKind::Formula);
        assert!(score(&entity, &both_right) > 0.0);
    }

    #[test]
    fn test_tag_filter_is_any_match_case_insensitive() {
        let entity = formula("asphalt", &["Paving", "Estimating"]);
        let scorer = Scorer::default();

        assert!(scorer.passes_filters(&entity, &SearchQuery::new("").with_tags(["paving"])));
        assert!(scorer.passes_filters(
            &entity,
            &SearchQuery::new("").with_tags(["striping", "ESTIMATING"])
        ));
        assert!(!scorer.passes_filters(&entity, &SearchQuery::new("").with_tags(["striping"])));
    }

    #[test]
    fn test_author_and_industry_filters() {
        let doc = NewDocument::new("Spec", "asphalt spec", "specifications")
            .with_author("J. Ortiz")
            .with_industry("Paving")
            .into_document("doc-1".to_string(), Utc::now());
        let no_author = formula("asphalt", &[]);
        let scorer = Scorer::default();

        assert!(scorer.passes_filters(&doc, &SearchQuery::new("").with_author("j. ortiz")));
        assert!(!scorer.passes_filters(&doc, &SearchQuery::new("").with_author("someone")));
        assert!(!scorer.passes_filters(&no_author, &SearchQuery::new("").with_author("j. ortiz")));
        assert!(scorer.passes_filters(&doc, &SearchQuery::new("").with_industry("PAVING")));
        assert!(!scorer.passes_filters(&no_author, &SearchQuery::new("").with_industry("paving")));
    }

    #[test]
    fn test_date_range_filter_uses_updated_at() {
        let entity = formula("asphalt", &[]);
        let updated = entity.meta.updated_at;
        let scorer = Scorer::default();

        let covering = DateRange::new(Some(updated - Duration::hours(1)), Some(updated));
        let before = DateRange::new(None, Some(updated - Duration::hours(1)));

        assert!(scorer.passes_filters(&entity, &SearchQuery::new("").with_date_range(covering)));
        assert!(!scorer.passes_filters(&entity, &SearchQuery::new("").with_date_range(before)));
    }

    #[test]
    fn test_custom_weights() {
        let scorer = Scorer::new(ScoringSettings {
            exact_match_points: 1.0,
            occurrence_points: 2.0,
            tag_points: 4.0,
        });
        let entity = formula("asphalt asphalt", &["asphalt"]);
        let query = SearchQuery::new("asphalt");
        assert_eq!(scorer.score(&entity, &query_terms(&query.text), &query), 8.0);
    }
}
