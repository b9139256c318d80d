//! Object store abstraction for partition persistence.
//!
//! The pipeline addresses partitions by key; where the bytes live is a
//! backend concern. `FsStore` is the durable backend, `MemStore` backs
//! tests and dry runs.

pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemStore;

use thiserror::Error;

/// Errors surfaced by object store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object write failed: {0}")]
    Write(String),

    #[error("object read failed: {0}")]
    Read(String),

    #[error("object not found: {key}")]
    NotFound { key: String },
}

/// A keyed blob store with whole-object put/get semantics.
///
/// `put` must never leave a partially written object readable at `key`:
/// backends stage and publish atomically. Re-putting a key replaces the
/// previous object entirely.
pub trait ObjectStore: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Stable URI for an object at `key`, independent of whether it exists.
    fn uri(&self, key: &str) -> String;
}
