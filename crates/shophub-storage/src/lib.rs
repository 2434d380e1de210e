//! shophub-storage: Durable key-value storage backends for shophub

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "file")]
pub mod file;

#[cfg(feature = "memory")]
pub use memory::{MemoryConfig, MemoryStorage};

#[cfg(feature = "file")]
pub use file::{FileConfig, FileStorage};
