//! Storage used by the dispatch server.
//!
//! - `Storage`: a small wrapper around `object_store` (local filesystem or
//!   in-memory backends)
//! - `StatStorage`: the processed-count statistics, optionally persisted
//!   through `Storage`

mod object;
mod stat;

pub use object::{Storage, StorageConfig, StorageError, StorageKind};
pub use stat::{StatStorage, TOTAL_COUNT_KEY};
