//! Persisted record shapes, kept separate from the domain model so the
//! on-disk format can evolve on its own schedule.

mod pending_memory;

pub use pending_memory::{PENDING_MEMORY_SCHEMA_VERSION, PendingMemoryDTO};
