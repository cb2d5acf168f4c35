//! # knowledge-types
//!
//! Shared domain types for the knowledge base retrieval engine.
//!
//! This crate defines the core data structures used throughout the system:
//! - Entities: formulas, calculations, documents and datasets
//! - Categories: the filter vocabulary for entities
//! - Queries and results: what callers ask and what the engine answers
//! - Access events: telemetry for searches and entity views
//! - Snapshots: versioned export of the whole knowledge base
//! - Settings: configuration types
//!
//! ## Usage
//!
//! ```rust
//! use knowledge_types::{EntityKind, SearchQuery};
//!
//! let query = SearchQuery::new("asphalt").with_kind(EntityKind::Formula);
//! assert_eq!(query.kind, Some(EntityKind::Formula));
//! ```

pub mod access;
pub mod config;
pub mod draft;
pub mod entity;
pub mod error;
pub mod query;
pub mod snapshot;

pub use access::{AccessEvent, AccessKind, UsageStats};
pub use config::{ScoringSettings, Settings};
pub use draft::{DocumentPatch, NewCalculation, NewDataset, NewDocument, NewFormula};
pub use entity::{
    AccessLevel, Calculation, CalculationInput, Category, Dataset, Document, DocumentStatus,
    Entity, EntityKind, EntityMeta, Formula, FormulaVariable, PrimaryField, Searchable,
};
pub use error::KnowledgeError;
pub use query::{DateRange, SearchQuery, SearchResult};
pub use snapshot::{Snapshot, FORMAT_VERSION};
