//! # Cache Store
//!
//! [`CacheStore`] owns the cache index and is the only writer of `blob:*`,
//! `cache:index`, and `cache:size`. A single mutex guards the in-memory
//! index and its running total; every insert and removal persists both
//! before releasing it.
//!
//! ## Failure Policy
//!
//! Methods return `Result<_, CacheError>` so callers see maintenance
//! failures, but removal of ancillary data during eviction (blob bytes,
//! status rows) is logged and skipped rather than aborting the pass. An
//! index row is always dropped together with its size, so the
//! `sum == total` invariant holds even when a blob file could not be
//! deleted; the orphaned file is collected by the next [`CacheStore::open`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use cidgate_core::{Cid, Clock, Timestamp};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::CacheError;
use crate::evict::{self, CacheConfig, Eviction};
use crate::index::CacheIndex;
use crate::keys;
use crate::kv::KvStore;
use crate::records::IndexRecord;

/// Result of [`CacheStore::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The blob was stored; `evicted` lists entries removed by the pass that
    /// followed the insert (possibly including older copies of other CIDs).
    Stored { evicted: Vec<Eviction> },
    /// The blob alone exceeds `max_total_size_bytes` and was not cached.
    SkippedOversized { size: u64 },
}

/// Point-in-time cache summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub oldest: Option<Timestamp>,
    pub newest: Option<Timestamp>,
    pub max_total_size_bytes: u64,
    pub max_item_count: usize,
}

/// The bounded blob cache plus status and gateway records.
#[derive(Debug)]
pub struct CacheStore {
    pub(crate) kv: Arc<dyn KvStore>,
    pub(crate) clock: Arc<dyn Clock>,
    config: CacheConfig,
    index: Mutex<CacheIndex>,
}

impl CacheStore {
    /// Open a cache over `kv`, loading and reconciling the persisted index.
    ///
    /// Reconciliation drops index rows whose blob is missing, deletes blobs
    /// with no index row, and rewrites `cache:size` when it disagrees with
    /// the sum over the index. A corrupt index is logged and treated as
    /// empty, which in turn collects every blob as an orphan.
    pub fn open(
        kv: Arc<dyn KvStore>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let mut dirty = false;
        let mut index = match kv.get(keys::CACHE_INDEX)? {
            None => CacheIndex::new(),
            Some(bytes) => match serde_json::from_slice::<BTreeMap<String, IndexRecord>>(&bytes) {
                Ok(map) => {
                    let (index, rejected) = CacheIndex::from_persisted(map);
                    if !rejected.is_empty() {
                        tracing::warn!(count = rejected.len(), "dropping index rows with invalid CIDs");
                        dirty = true;
                    }
                    index
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cache index is corrupt; starting empty");
                    dirty = true;
                    CacheIndex::new()
                }
            },
        };

        let blob_keys: BTreeSet<String> = kv.keys_with_prefix(keys::BLOB_PREFIX)?.into_iter().collect();

        let missing: Vec<Cid> = index
            .cids()
            .filter(|cid| !blob_keys.contains(&keys::blob(cid)))
            .cloned()
            .collect();
        for cid in &missing {
            tracing::warn!(cid = %cid, "index row has no blob; dropping");
            index.remove(cid);
            dirty = true;
        }

        for key in &blob_keys {
            let indexed = key
                .strip_prefix(keys::BLOB_PREFIX)
                .and_then(|raw| Cid::new(raw).ok())
                .is_some_and(|cid| index.contains(&cid));
            if !indexed {
                tracing::warn!(key = %key, "blob has no index row; removing");
                if let Err(e) = kv.remove(key) {
                    tracing::warn!(key = %key, error = %e, "failed to remove orphaned blob");
                }
            }
        }

        let stored_total = match kv.get(keys::CACHE_SIZE)? {
            None => None,
            Some(bytes) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok()),
        };
        if stored_total != Some(index.total()) {
            if stored_total.is_some() || !index.is_empty() {
                tracing::warn!(
                    stored = ?stored_total,
                    actual = index.total(),
                    "running cache size disagrees with index; recomputed"
                );
            }
            dirty = true;
        }

        let store = Self {
            kv,
            clock,
            config,
            index: Mutex::new(index),
        };
        {
            let index = store.index.lock();
            if dirty {
                store.persist_locked(&index)?;
            }
            tracing::debug!(entries = index.len(), total_bytes = index.total(), "cache opened");
        }
        Ok(store)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Whether an entry for `cid` is indexed.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.index.lock().contains(cid)
    }

    /// Read a cached blob.
    ///
    /// An index row whose blob has disappeared from the backend is dropped
    /// and reported as a miss. The blob read happens outside the lock, so a
    /// miss is confirmed under the lock before the row goes: an insert that
    /// landed in between keeps its row.
    pub fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, CacheError> {
        if !self.contains(cid) {
            return Ok(None);
        }
        let key = keys::blob(cid);
        if let Some(bytes) = self.kv.get(&key)? {
            return Ok(Some(bytes));
        }

        let mut index = self.index.lock();
        if !index.contains(cid) {
            return Ok(None);
        }
        if let Some(bytes) = self.kv.get(&key)? {
            return Ok(Some(bytes));
        }
        tracing::warn!(cid = %cid, "indexed blob missing from backend; dropping row");
        index.remove(cid);
        self.persist_locked(&index)?;
        Ok(None)
    }

    /// Store `bytes` under `cid`, then run one eviction pass.
    ///
    /// Re-inserting an existing CID replaces its blob and refreshes its
    /// timestamp.
    pub fn insert(&self, cid: &Cid, bytes: &[u8]) -> Result<InsertOutcome, CacheError> {
        let size = bytes.len() as u64;
        if size > self.config.max_total_size_bytes {
            tracing::warn!(
                cid = %cid,
                size,
                cap = self.config.max_total_size_bytes,
                "blob exceeds cache capacity; not caching"
            );
            return Ok(InsertOutcome::SkippedOversized { size });
        }

        let mut index = self.index.lock();
        self.kv.put(&keys::blob(cid), bytes)?;
        let now = self.clock.now();
        index.insert(
            cid.clone(),
            IndexRecord {
                size,
                timestamp: now,
            },
        );
        let victims = evict::plan(&index, &self.config, now);
        let evicted = self.evict_locked(&mut index, victims);
        self.persist_locked(&index)?;

        tracing::debug!(
            cid = %cid,
            size,
            evicted = evicted.len(),
            total_bytes = index.total(),
            entries = index.len(),
            "cached blob"
        );
        Ok(InsertOutcome::Stored { evicted })
    }

    /// Remove the entry for `cid`, its blob, and its status row.
    pub fn remove(&self, cid: &Cid) -> Result<bool, CacheError> {
        let mut index = self.index.lock();
        let Some(rec) = index.remove(cid) else {
            return Ok(false);
        };
        self.remove_ancillary(cid);
        self.persist_locked(&index)?;
        tracing::debug!(cid = %cid, size = rec.size, "removed cache entry");
        Ok(true)
    }

    /// Evict every entry older than `max_age`.
    pub fn sweep_expired(&self) -> Result<Vec<Eviction>, CacheError> {
        let mut index = self.index.lock();
        let now = self.clock.now();
        let victims = evict::plan_expired(&index, &self.config, now);
        if victims.is_empty() {
            return Ok(victims);
        }
        let evicted = self.evict_locked(&mut index, victims);
        self.persist_locked(&index)?;
        Ok(evicted)
    }

    /// Remove every cached entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut index = self.index.lock();
        let cids: Vec<Cid> = index.cids().cloned().collect();
        for cid in &cids {
            index.remove(cid);
            self.remove_ancillary(cid);
        }
        self.persist_locked(&index)?;
        Ok(cids.len())
    }

    pub fn stats(&self) -> CacheStats {
        let index = self.index.lock();
        CacheStats {
            entries: index.len(),
            total_bytes: index.total(),
            oldest: index.oldest(),
            newest: index.newest(),
            max_total_size_bytes: self.config.max_total_size_bytes,
            max_item_count: self.config.max_item_count,
        }
    }

    /// Snapshot of all index rows, oldest first.
    pub fn entries(&self) -> Vec<(Cid, IndexRecord)> {
        self.index
            .lock()
            .oldest_first()
            .map(|(cid, rec)| (cid.clone(), *rec))
            .collect()
    }

    fn evict_locked(&self, index: &mut CacheIndex, victims: Vec<Eviction>) -> Vec<Eviction> {
        for victim in &victims {
            index.remove(&victim.cid);
            self.remove_ancillary(&victim.cid);
            tracing::debug!(
                cid = %victim.cid,
                size = victim.size,
                reason = %victim.reason,
                "evicted cache entry"
            );
        }
        victims
    }

    /// Best-effort removal of a blob and its status row.
    fn remove_ancillary(&self, cid: &Cid) {
        for key in [keys::blob(cid), keys::status(cid)] {
            if let Err(e) = self.kv.remove(&key) {
                tracing::warn!(key = %key, error = %e, "failed to remove cache data");
            }
        }
    }

    fn persist_locked(&self, index: &CacheIndex) -> Result<(), CacheError> {
        let encoded = serde_json::to_vec(&index.to_persisted()).map_err(|e| CacheError::Serialize {
            key: keys::CACHE_INDEX.to_string(),
            source: e,
        })?;
        self.kv.put(keys::CACHE_INDEX, &encoded)?;
        self.kv.put(keys::CACHE_SIZE, index.total().to_string().as_bytes())
    }
}
