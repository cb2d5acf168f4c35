//! Store layer error types.

use knowledge_types::{EntityKind, KnowledgeError};
use thiserror::Error;

/// Errors that can occur in the store layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Entity or category submitted without an id
    #[error("Empty id for {0}")]
    EmptyId(String),

    /// No entity with this id in the kind's partition
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
}

impl From<StoreError> for KnowledgeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyId(what) => {
                KnowledgeError::Validation(format!("{} id must not be empty", what))
            }
            StoreError::NotFound { kind, id } => KnowledgeError::NotFound { kind, id },
        }
    }
}
