//! In-memory key-value storage

mod backend;

pub use backend::{MemoryConfig, MemoryStorage, StorageStats};
