//! Durable storage primitives and the key-value backends built on them.

pub mod atomic_file;
mod file_kv_storage;
mod memory_kv_storage;

pub use atomic_file::{AtomicTomlFile, FileLock, write_atomic};
pub use file_kv_storage::FileKeyValueStorage;
pub use memory_kv_storage::InMemoryKeyValueStorage;
