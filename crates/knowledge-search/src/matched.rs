//! Matched-field annotation for search results.

use knowledge_types::{PrimaryField, Searchable};

/// Primary fields containing at least one term, in field order.
///
/// Annotation only; scoring does not consult this.
pub fn matched_fields(entity: &dyn Searchable, terms: &[String]) -> Vec<PrimaryField> {
    entity
        .primary_fields()
        .into_iter()
        .filter(|(_, text)| {
            let lowered = text.to_lowercase();
            terms.iter().any(|term| lowered.contains(term.as_str()))
        })
        .map(|(field, _)| field)
        .collect()
}
