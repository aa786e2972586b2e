//! # Gateways
//!
//! A [`Gateway`] is an HTTP endpoint that serves blobs at `{base_url}/{cid}`.
//! The configured [`GatewayList`] is loaded once at startup and never
//! re-sorted: its order is the probe candidate set and the fallback order.
//!
//! [`GatewayHealth`] is the result of one probe pass, persisted by the
//! resolver and replaced wholesale on refresh.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cid::Cid;
use crate::error::ValidationError;
use crate::temporal::Timestamp;

/// An immutable gateway record.
///
/// Deserialization goes through [`Gateway::new`], so persisted records are
/// validated like configured ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GatewayRecord")]
pub struct Gateway {
    /// Base URL without a trailing slash, e.g. `https://ipfs.io/ipfs`.
    base_url: String,
    /// Zero-based position in the configured fallback list.
    position: usize,
}

impl Gateway {
    /// Create a gateway from a base URL and its list position.
    ///
    /// The URL must parse and use the `http` or `https` scheme. Trailing
    /// slashes are stripped so that [`Gateway::url_for`] never produces `//`.
    pub fn new(base_url: &str, position: usize) -> Result<Self, ValidationError> {
        let raw = base_url.trim();
        let parsed = Url::parse(raw).map_err(|e| ValidationError::InvalidGatewayUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidGatewayUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }
        Ok(Self {
            base_url: raw.trim_end_matches('/').to_string(),
            position,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Position in the configured list.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Full content URL for `cid` on this gateway.
    pub fn url_for(&self, cid: &Cid) -> String {
        format!("{}/{}", self.base_url, cid)
    }
}

/// Wire shape of a [`Gateway`].
#[derive(Deserialize)]
struct GatewayRecord {
    base_url: String,
    position: usize,
}

impl TryFrom<GatewayRecord> for Gateway {
    type Error = ValidationError;

    fn try_from(record: GatewayRecord) -> Result<Self, Self::Error> {
        Self::new(&record.base_url, record.position)
    }
}

impl std::fmt::Display for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// The ordered, non-empty list of configured gateways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayList {
    gateways: Vec<Gateway>,
}

impl GatewayList {
    /// Build a list from base URLs, assigning positions in iteration order.
    ///
    /// Returns [`ValidationError::NoGateways`] for an empty input.
    pub fn from_urls<I, S>(urls: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let gateways = urls
            .into_iter()
            .enumerate()
            .map(|(i, u)| Gateway::new(u.as_ref(), i))
            .collect::<Result<Vec<_>, _>>()?;
        if gateways.is_empty() {
            return Err(ValidationError::NoGateways);
        }
        Ok(Self { gateways })
    }

    /// The first configured gateway, used as the static default.
    pub fn first(&self) -> &Gateway {
        // Non-empty by construction.
        &self.gateways[0]
    }

    /// Iterate in configured order.
    pub fn iter(&self) -> std::slice::Iter<'_, Gateway> {
        self.gateways.iter()
    }

    /// Number of configured gateways.
    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Look up the configured gateway whose base URL matches `base_url`.
    pub fn find(&self, base_url: &str) -> Option<&Gateway> {
        let needle = base_url.trim_end_matches('/');
        self.gateways.iter().find(|g| g.base_url == needle)
    }

    /// Borrow as a slice.
    pub fn as_slice(&self) -> &[Gateway] {
        &self.gateways
    }
}

impl<'a> IntoIterator for &'a GatewayList {
    type Item = &'a Gateway;
    type IntoIter = std::slice::Iter<'a, Gateway>;

    fn into_iter(self) -> Self::IntoIter {
        self.gateways.iter()
    }
}

/// One measured round trip during a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySample {
    /// The gateway that answered.
    pub gateway: Gateway,
    /// Round-trip latency in milliseconds.
    pub latency_ms: u64,
}

/// Result of one probe pass across all configured gateways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayHealth {
    /// Fastest responsive gateway, or the first configured gateway when no
    /// gateway responded.
    pub ranked_gateway: Gateway,
    /// When the probe completed.
    pub measured_at: Timestamp,
    /// Responsive gateways, ascending by latency.
    pub sample_latencies: Vec<GatewaySample>,
}

impl GatewayHealth {
    /// Whether any gateway answered the probe.
    pub fn any_responsive(&self) -> bool {
        !self.sample_latencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash_and_builds_content_url() {
        let gw = Gateway::new("https://ipfs.io/ipfs/", 0).unwrap();
        assert_eq!(gw.base_url(), "https://ipfs.io/ipfs");
        let cid = Cid::new("QmAbc").unwrap();
        assert_eq!(gw.url_for(&cid), "https://ipfs.io/ipfs/QmAbc");
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(Gateway::new("ftp://example.com", 0).is_err());
        assert!(Gateway::new("not a url", 0).is_err());
    }

    #[test]
    fn list_assigns_positions_in_order() {
        let list = GatewayList::from_urls(["https://a.example", "https://b.example"]).unwrap();
        let positions: Vec<_> = list.iter().map(|g| g.position()).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(list.first().base_url(), "https://a.example");
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = GatewayList::from_urls(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, ValidationError::NoGateways);
    }

    #[test]
    fn find_ignores_trailing_slash() {
        let list = GatewayList::from_urls(["https://a.example/ipfs"]).unwrap();
        assert!(list.find("https://a.example/ipfs/").is_some());
        assert!(list.find("https://b.example/ipfs").is_none());
    }

    #[test]
    fn health_round_trips_through_json() {
        let gw = Gateway::new("https://a.example", 0).unwrap();
        let health = GatewayHealth {
            ranked_gateway: gw.clone(),
            measured_at: Timestamp::from_millis(42),
            sample_latencies: vec![GatewaySample {
                gateway: gw,
                latency_ms: 17,
            }],
        };
        let json = serde_json::to_string(&health).unwrap();
        let back: GatewayHealth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, health);
    }

    #[test]
    fn deserialize_validates_like_new() {
        let ok: Gateway =
            serde_json::from_str(r#"{"base_url":"https://a.example/ipfs/","position":2}"#).unwrap();
        assert_eq!(ok.base_url(), "https://a.example/ipfs");
        assert_eq!(ok.position(), 2);
        assert!(serde_json::from_str::<Gateway>(r#"{"base_url":"ftp://a.example","position":0}"#).is_err());
        assert!(serde_json::from_str::<Gateway>(r#"{"base_url":"not a url","position":0}"#).is_err());
    }
}
