//! # Key-Value Persistence
//!
//! [`KvStore`] is the seam between the cache and its storage medium. Every
//! operation is a single-key read or write that is treated as atomic; the
//! cache layers its own mutex on top for multi-key invariants.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::CacheError;

/// String-keyed byte storage.
///
/// Implementations must be `Send + Sync` so a single store can be shared
/// behind an `Arc` by the cache, resolver, and status checker.
pub trait KvStore: Send + Sync + std::fmt::Debug {
    /// Read the value at `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write `value` at `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    /// Delete `key`. Returns whether a value was present.
    fn remove(&self, key: &str) -> Result<bool, CacheError>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

/// In-memory [`KvStore`]. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
