pub mod config_service;
pub mod dto;
pub mod logging;
pub mod media_reader;
pub mod network_observer;
pub mod paths;
pub mod pending_memory_store;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::media_reader::FsMediaReader;
pub use crate::network_observer::ChannelNetworkObserver;
pub use crate::paths::SunroofPaths;
pub use crate::pending_memory_store::DurablePendingMemoryStore;
pub use crate::storage::{FileKeyValueStorage, InMemoryKeyValueStorage};
