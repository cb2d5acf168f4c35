//! Error types for the knowledge base.

use thiserror::Error;

use crate::entity::EntityKind;

/// Unified error type for knowledge base write paths.
///
/// Read paths never produce these; they return empty results or `None`.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Unknown id on a mutation
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Malformed entity or argument
    #[error("Validation error: {0}")]
    Validation(String),

    /// Snapshot could not be applied; prior state is untouched
    #[error("Import error: {0}")]
    Import(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KnowledgeError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        KnowledgeError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
