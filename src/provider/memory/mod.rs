//! In-memory store implementations
//!
//! Back the state file model and the test suite. Thread-safe using
//! `Arc<RwLock>`; clones share the same underlying data.

mod relations;
mod secrets;

pub use relations::{MemoryRelationStore, RelationRecord};
pub use secrets::{MemorySecretStore, SecretRecord};
