//! In-memory storage for the knowledge base.
//!
//! Provides:
//! - [`ContentStore`]: entities partitioned by kind, insertion order preserved
//! - [`AccessTracker`]: bounded recent-access log plus per-entity usage counters
//!
//! Neither type does any locking of its own contents beyond what the access
//! tracker needs to be shared; the engine owns the write discipline.

pub mod access;
pub mod content;
pub mod error;

pub use access::AccessTracker;
pub use content::{ContentStore, Keyed, Partition};
pub use error::StoreError;
