//! Tokenization shared by the indexer and the query path.
//!
//! Text is lower-cased and split on runs of whitespace. Punctuation is kept,
//! so "grade." and "grade" are different tokens.

/// Index tokens of a field, in order, duplicates included.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Terms of a query. Blank text yields no terms, never an empty term.
pub fn query_terms(text: &str) -> Vec<String> {
    tokenize(text)
}
