//! # Cache Eviction
//!
//! Eviction is strictly oldest-first. One pass walks the index in age order
//! and removes entries while any of the following holds for the entry at
//! the head:
//!
//! - it is older than `max_age`,
//! - the item count exceeds `max_item_count`,
//! - the pass started over `max_total_size_bytes` and the total is still
//!   above 80% of it.
//!
//! The 80% target gives hysteresis so a cache hovering at its cap does not
//! evict on every subsequent insert. Because all three conditions are
//! monotone in age order, the walk stops at the first entry that satisfies
//! none of them.

use std::time::Duration;

use cidgate_core::{Cid, Timestamp};
use serde::{Deserialize, Serialize};

use crate::index::CacheIndex;

/// Size-pressure evictions stop once the total is at or below this share
/// of the cap, expressed as a percentage.
pub const SIZE_TARGET_PERCENT: u64 = 80;

/// Process-wide cache bounds, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_total_size_bytes: u64,
    /// Maximum entry age, in milliseconds when serialized.
    #[serde(with = "duration_millis", rename = "max_age_ms")]
    pub max_age: Duration,
    pub max_item_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_total_size_bytes: 100 * 1024 * 1024,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
            max_item_count: 500,
        }
    }
}

impl CacheConfig {
    /// Total size that size-pressure eviction drives down to.
    pub fn size_target(&self) -> u64 {
        self.max_total_size_bytes / 100 * SIZE_TARGET_PERCENT
            + self.max_total_size_bytes % 100 * SIZE_TARGET_PERCENT / 100
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Why an entry was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    Expired,
    ItemCount,
    TotalSize,
}

impl std::fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => f.write_str("expired"),
            Self::ItemCount => f.write_str("item-count"),
            Self::TotalSize => f.write_str("total-size"),
        }
    }
}

/// One entry chosen for eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub cid: Cid,
    pub size: u64,
    pub stored_at: Timestamp,
    pub reason: EvictionReason,
}

/// Choose the entries one eviction pass removes, oldest first.
pub fn plan(index: &CacheIndex, config: &CacheConfig, now: Timestamp) -> Vec<Eviction> {
    let mut count = index.len();
    let mut total = index.total();
    let size_pressure = total > config.max_total_size_bytes;
    let size_target = config.size_target();

    let mut victims = Vec::new();
    for (cid, rec) in index.oldest_first() {
        let reason = if rec.timestamp.elapsed_until(now) > config.max_age {
            EvictionReason::Expired
        } else if count > config.max_item_count {
            EvictionReason::ItemCount
        } else if size_pressure && total > size_target {
            EvictionReason::TotalSize
        } else {
            break;
        };
        victims.push(Eviction {
            cid: cid.clone(),
            size: rec.size,
            stored_at: rec.timestamp,
            reason,
        });
        count -= 1;
        total -= rec.size;
    }
    victims
}

/// Only the age-expired prefix of the index.
pub fn plan_expired(index: &CacheIndex, config: &CacheConfig, now: Timestamp) -> Vec<Eviction> {
    index
        .oldest_first()
        .take_while(|(_, rec)| rec.timestamp.elapsed_until(now) > config.max_age)
        .map(|(cid, rec)| Eviction {
            cid: cid.clone(),
            size: rec.size,
            stored_at: rec.timestamp,
            reason: EvictionReason::Expired,
        })
        .collect()
}
