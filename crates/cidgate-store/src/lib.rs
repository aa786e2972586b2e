//! # cidgate-store: Bounded Local Cache
//!
//! Durable key-value persistence for cached blobs, the size/age index, and
//! the small status and gateway records that the client consults before
//! touching the network.
//!
//! ## Layout
//!
//! Everything is stored through the [`KvStore`] trait under fixed key
//! prefixes (see [`keys`]). Two backends ship with the crate:
//!
//! - [`MemoryKvStore`]: a `BTreeMap` behind a lock, for tests and
//!   ephemeral processes.
//! - [`FsKvStore`]: one file per key, written via temp-file + rename.
//!
//! ## Invariants
//!
//! [`CacheStore`] is the single owner of the cache index. One mutex guards
//! the index together with its running size total, so after every insert or
//! removal:
//!
//! - every blob key has exactly one index row,
//! - `sum(index.size) == running total`,
//! - the item-count and total-size caps of [`CacheConfig`] hold.
//!
//! Eviction is strictly oldest-first (see [`evict`]).

pub mod cache;
pub mod error;
pub mod evict;
pub mod fs;
pub mod index;
pub mod keys;
pub mod kv;
pub mod records;
mod state;

pub use cache::{CacheStats, CacheStore, InsertOutcome};
pub use error::CacheError;
pub use evict::{CacheConfig, Eviction, EvictionReason};
pub use fs::FsKvStore;
pub use index::CacheIndex;
pub use kv::{KvStore, MemoryKvStore};
pub use records::{IndexRecord, PreferredGateway, Selection, StatusEntry};
