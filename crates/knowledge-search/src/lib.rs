//! # knowledge-search
//!
//! Free-text retrieval over the knowledge base content store.
//!
//! ## Features
//! - Inverted index (token -> kind -> ids), rebuilt from the store on demand
//! - Additive relevance scoring with exact and occurrence modes plus tag boosts
//! - Hard filters on category, kind, tags, author, industry and update time
//! - Sentence highlights and matched-field annotation for each result

pub mod highlight;
pub mod index;
pub mod matched;
pub mod scorer;
pub mod searcher;
pub mod tokenize;

pub use highlight::{highlights, split_sentences};
pub use index::{IndexStats, InvertedIndex, Postings};
pub use matched::matched_fields;
pub use scorer::Scorer;
pub use searcher::Searcher;
pub use tokenize::{query_terms, tokenize};
