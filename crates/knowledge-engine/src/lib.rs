//! Retrieval engine facade for the knowledge base.
//!
//! Provides:
//! - [`RetrievalEngine`]: search, per-kind add/get/list, document updates
//! - Snapshot export and atomic, staged import
//! - Observer notifications for adds, updates and imports
//!
//! Writers are serialized and publish a fully rebuilt state in one pointer
//! swap, so readers always see either the state before a write or after it.

pub mod engine;
pub mod events;
pub mod snapshot;

pub use engine::{EngineStats, RetrievalEngine};
pub use events::{EngineEvent, EngineObserver, ObserverRegistry, SubscriptionId};
