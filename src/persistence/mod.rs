//! Persistence layer for the fraud-chain graph
//!
//! A [`GraphBackend`] receives each validated [`ChangeSet`] before it is
//! applied in memory and replays its contents at startup:
//! - [`PersistentStorage`]: RocksDB, one `WriteBatch` per change set
//! - [`MemoryBackend`]: no durability, used when no data path is configured

pub mod storage;

pub use storage::PersistentStorage;

use crate::graph::{ChangeSet, GraphSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Metadata encoding error
    #[error("Metadata encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// A second node would claim an existing identity
    #[error("Unique constraint violated for {node_type}/{reference_id}")]
    UniqueViolation {
        node_type: String,
        reference_id: String,
    },

    /// Stored bytes do not decode
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a custom backend
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home of the graph
pub trait GraphBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Persist a change set atomically
    fn commit(&self, changes: &ChangeSet) -> StorageResult<()>;

    /// Read every stored record
    fn load(&self) -> StorageResult<GraphSnapshot>;

    /// Flush pending writes to durable media
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Backend without durability
#[derive(Debug, Default)]
pub struct MemoryBackend {
    commits: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty change sets committed
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }
}

impl GraphBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        if !changes.is_empty() {
            self.commits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn load(&self) -> StorageResult<GraphSnapshot> {
        Ok(GraphSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Chain, ChainId};

    #[test]
    fn test_memory_backend_counts_commits() {
        let backend = MemoryBackend::new();
        backend.commit(&ChangeSet::new()).unwrap();
        assert_eq!(backend.commits(), 0);

        let mut cs = ChangeSet::new();
        cs.put_chain(Chain::new(ChainId::new(1), None));
        backend.commit(&cs).unwrap();
        assert_eq!(backend.commits(), 1);
        assert!(backend.load().unwrap().is_empty());
        assert_eq!(backend.name(), "memory");
    }
}
