//! Key-value storage persisted as a JSON document on disk

mod backend;

pub use backend::{FileConfig, FileStorage};
