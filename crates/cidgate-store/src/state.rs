//! Status and gateway records kept alongside the blob cache.
//!
//! These are small JSON values replaced wholesale on every write. Freshness
//! is judged by the caller against its own window.

use cidgate_core::{Cid, GatewayHealth};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheStore;
use crate::error::CacheError;
use crate::keys;
use crate::records::{PreferredGateway, StatusEntry};

impl CacheStore {
    /// Last recorded availability of `cid`.
    pub fn status(&self, cid: &Cid) -> Result<Option<StatusEntry>, CacheError> {
        self.read_json(&keys::status(cid))
    }

    /// Record availability of `cid` as of now.
    pub fn put_status(&self, cid: &Cid, available: bool) -> Result<StatusEntry, CacheError> {
        let entry = StatusEntry {
            cid: cid.clone(),
            available,
            checked_at: self.clock.now(),
        };
        self.write_json(&keys::status(cid), &entry)?;
        Ok(entry)
    }

    pub fn remove_status(&self, cid: &Cid) -> Result<bool, CacheError> {
        self.kv.remove(&keys::status(cid))
    }

    pub fn preferred_gateway(&self) -> Result<Option<PreferredGateway>, CacheError> {
        self.read_json(keys::PREFERRED_GATEWAY)
    }

    pub fn set_preferred_gateway(&self, preferred: &PreferredGateway) -> Result<(), CacheError> {
        self.write_json(keys::PREFERRED_GATEWAY, preferred)
    }

    /// Probe result measured against `probe_cid`.
    pub fn gateway_health(&self, probe_cid: &Cid) -> Result<Option<GatewayHealth>, CacheError> {
        self.read_json(&keys::speed(probe_cid))
    }

    pub fn put_gateway_health(
        &self,
        probe_cid: &Cid,
        health: &GatewayHealth,
    ) -> Result<(), CacheError> {
        self.write_json(&keys::speed(probe_cid), health)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.kv.get(key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CacheError::corrupt(key, e)),
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Serialize {
            key: key.to_string(),
            source: e,
        })?;
        self.kv.put(key, &bytes)
    }
}
