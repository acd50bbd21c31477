//! Pending-memory domain module.
//!
//! # Module Structure
//!
//! - `model`: `PendingMemory`, its tagged payload and lifecycle status
//! - `store`: the `PendingMemoryStore` trait implemented by infrastructure
//! - `remote`: object storage / database / media reader collaborators

mod model;
pub mod remote;
pub mod store;

pub use model::{
    GeoLocation, MemoryContent, MemoryKind, MemoryStatus, NewPendingMemory, PendingMemory,
    WeatherSnapshot, normalize_tags,
};
pub use remote::{MediaReader, MemoryDatabase, MemoryRecord, NewMemoryRecord, ObjectStorage};
pub use store::{PendingCountListener, PendingMemoryStore};
