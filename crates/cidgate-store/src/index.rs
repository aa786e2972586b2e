//! # Cache Index
//!
//! In-memory view of `cache:index`: rows keyed by CID plus an age-ordered
//! set for oldest-first iteration, and the running total of blob sizes.
//! Every mutation updates all three together.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cidgate_core::{Cid, Timestamp};

use crate::records::IndexRecord;

#[derive(Debug, Default, Clone)]
pub struct CacheIndex {
    rows: HashMap<Cid, IndexRecord>,
    by_age: BTreeSet<(Timestamp, Cid)>,
    total: u64,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the persisted `{cid: {size, timestamp}}` map. Keys that
    /// fail CID validation are skipped and returned.
    pub fn from_persisted(map: BTreeMap<String, IndexRecord>) -> (Self, Vec<String>) {
        let mut index = Self::new();
        let mut rejected = Vec::new();
        for (raw, rec) in map {
            match Cid::new(&raw) {
                Ok(cid) => {
                    index.insert(cid, rec);
                }
                Err(_) => rejected.push(raw),
            }
        }
        (index, rejected)
    }

    pub fn to_persisted(&self) -> BTreeMap<String, IndexRecord> {
        self.rows
            .iter()
            .map(|(cid, rec)| (cid.to_string(), *rec))
            .collect()
    }

    /// Insert or replace a row. Returns the replaced row.
    pub fn insert(&mut self, cid: Cid, rec: IndexRecord) -> Option<IndexRecord> {
        let old = self.remove(&cid);
        self.by_age.insert((rec.timestamp, cid.clone()));
        self.total += rec.size;
        self.rows.insert(cid, rec);
        old
    }

    pub fn remove(&mut self, cid: &Cid) -> Option<IndexRecord> {
        let rec = self.rows.remove(cid)?;
        self.by_age.remove(&(rec.timestamp, cid.clone()));
        self.total -= rec.size;
        Some(rec)
    }

    pub fn get(&self, cid: &Cid) -> Option<&IndexRecord> {
        self.rows.get(cid)
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.rows.contains_key(cid)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Running total of blob sizes.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Rows ordered by `timestamp` ascending, ties broken by CID.
    pub fn oldest_first(&self) -> impl Iterator<Item = (&Cid, &IndexRecord)> + '_ {
        self.by_age
            .iter()
            .filter_map(move |(_, cid)| self.rows.get_key_value(cid))
    }

    pub fn oldest(&self) -> Option<Timestamp> {
        self.by_age.first().map(|(ts, _)| *ts)
    }

    pub fn newest(&self) -> Option<Timestamp> {
        self.by_age.last().map(|(ts, _)| *ts)
    }

    pub fn cids(&self) -> impl Iterator<Item = &Cid> + '_ {
        self.rows.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(size: u64, ts: i64) -> IndexRecord {
        IndexRecord {
            size,
            timestamp: Timestamp::from_millis(ts),
        }
    }

    fn cid(s: &str) -> Cid {
        Cid::new(s).unwrap()
    }

    #[test]
    fn total_tracks_inserts_replacements_and_removals() {
        let mut idx = CacheIndex::new();
        idx.insert(cid("a"), rec(10, 1));
        idx.insert(cid("b"), rec(5, 2));
        assert_eq!(idx.total(), 15);

        let old = idx.insert(cid("a"), rec(3, 3));
        assert_eq!(old, Some(rec(10, 1)));
        assert_eq!(idx.total(), 8);
        assert_eq!(idx.len(), 2);

        idx.remove(&cid("b"));
        assert_eq!(idx.total(), 3);
        assert!(idx.remove(&cid("b")).is_none());
    }

    #[test]
    fn iterates_oldest_first() {
        let mut idx = CacheIndex::new();
        idx.insert(cid("new"), rec(1, 30));
        idx.insert(cid("old"), rec(1, 10));
        idx.insert(cid("mid"), rec(1, 20));
        let order: Vec<_> = idx.oldest_first().map(|(c, _)| c.as_str()).collect();
        assert_eq!(order, vec!["old", "mid", "new"]);
        assert_eq!(idx.oldest(), Some(Timestamp::from_millis(10)));
        assert_eq!(idx.newest(), Some(Timestamp::from_millis(30)));
    }

    #[test]
    fn replacement_moves_row_in_age_order() {
        let mut idx = CacheIndex::new();
        idx.insert(cid("a"), rec(1, 1));
        idx.insert(cid("b"), rec(1, 2));
        idx.insert(cid("a"), rec(1, 3));
        let order: Vec<_> = idx.oldest_first().map(|(c, _)| c.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn persisted_form_skips_invalid_cids() {
        let mut map = BTreeMap::new();
        map.insert("good".to_string(), rec(4, 1));
        map.insert("bad/cid".to_string(), rec(4, 1));
        let (idx, rejected) = CacheIndex::from_persisted(map);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.total(), 4);
        assert_eq!(rejected, vec!["bad/cid".to_string()]);
        assert_eq!(idx.to_persisted().len(), 1);
    }
}
