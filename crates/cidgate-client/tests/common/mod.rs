//! Shared fixtures for the gateway client integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cidgate_client::{ClientConfig, GatewayClient, ProjectCredentials};
use cidgate_core::{Cid, GatewayList, ManualClock, Timestamp};
use cidgate_store::{CacheConfig, CacheStore, MemoryKvStore};
use wiremock::MockServer;

pub const PROBE_CID: &str = "QmProbeProbeProbe";
pub const START_MS: i64 = 1_700_000_000_000;

pub struct Harness {
    pub client: GatewayClient,
    pub kv: Arc<MemoryKvStore>,
    pub clock: Arc<ManualClock>,
}

pub fn cid(s: &str) -> Cid {
    Cid::new(s).unwrap()
}

/// `{server}/ipfs` for each server, in order.
pub fn gateway_urls(servers: &[&MockServer]) -> Vec<String> {
    servers.iter().map(|s| format!("{}/ipfs", s.uri())).collect()
}

pub fn probe_path() -> String {
    format!("/ipfs/{PROBE_CID}")
}

/// Config with short timeouts, no credentials, and no secondary API.
pub fn test_config(gateways: &[String], api: &str) -> ClientConfig {
    let mut config = ClientConfig::new(GatewayList::from_urls(gateways).unwrap()).unwrap();
    config.api_url = format!("{api}/api/v0").parse().unwrap();
    config.secondary_api_url = None;
    config.credentials = None;
    config.probe_cid = cid(PROBE_CID);
    config.probe_timeout = Duration::from_secs(1);
    config.status_timeout = Duration::from_secs(1);
    config.transfer_timeout = Duration::from_secs(5);
    config
}

pub fn with_credentials(mut config: ClientConfig, secondary: Option<&str>) -> ClientConfig {
    config.credentials = Some(ProjectCredentials::new("proj", "s3cret"));
    config.secondary_api_url = secondary.map(|s| format!("{s}/api/v0").parse().unwrap());
    config
}

pub fn harness(config: ClientConfig) -> Harness {
    harness_with_cache(config, CacheConfig::default())
}

pub fn harness_with_cache(config: ClientConfig, cache: CacheConfig) -> Harness {
    let kv = Arc::new(MemoryKvStore::new());
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(START_MS)));
    let store = CacheStore::open(kv.clone(), cache, clock.clone()).unwrap();
    let client = GatewayClient::new(config, Arc::new(store)).unwrap();
    Harness { client, kv, clock }
}
