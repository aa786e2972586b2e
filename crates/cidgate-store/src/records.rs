//! Persisted record types.
//!
//! All structured values are JSON. Field names are fixed because they are
//! the on-disk format: renaming one orphans every existing cache.

use cidgate_core::{Cid, Gateway, Timestamp};
use serde::{Deserialize, Serialize};

/// One row of the cache index: `{size, timestamp}` keyed by CID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Blob length in bytes.
    pub size: u64,
    /// When the blob was stored.
    pub timestamp: Timestamp,
}

/// Cached answer to "is this CID retrievable?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub cid: Cid,
    pub available: bool,
    pub checked_at: Timestamp,
}

/// How the current preferred gateway was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Fastest responder of a probe pass.
    Probe,
    /// Served a fallback download after the previous preference failed.
    Promoted,
}

/// The persisted preferred-gateway pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredGateway {
    pub gateway: Gateway,
    pub selected_at: Timestamp,
    pub selection: Selection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_record_uses_size_and_timestamp_fields() {
        let rec = IndexRecord {
            size: 12,
            timestamp: Timestamp::from_millis(99),
        };
        let json = serde_json::to_value(rec).unwrap();
        assert_eq!(json, serde_json::json!({"size": 12, "timestamp": 99}));
    }

    #[test]
    fn preferred_gateway_round_trips() {
        let pref = PreferredGateway {
            gateway: Gateway::new("https://a.example/ipfs", 2).unwrap(),
            selected_at: Timestamp::from_millis(5),
            selection: Selection::Promoted,
        };
        let bytes = serde_json::to_vec(&pref).unwrap();
        let back: PreferredGateway = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, pref);
        assert!(String::from_utf8(bytes).unwrap().contains("\"promoted\""));
    }
}
