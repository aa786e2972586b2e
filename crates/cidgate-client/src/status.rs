//! Availability checks with a cached answer per CID.

use std::sync::Arc;
use std::time::Duration;

use cidgate_core::{Cid, GatewayList};
use cidgate_store::CacheStore;

use crate::http;
use crate::persist;
use crate::pin::PinClient;
use crate::resolver::GatewayResolver;

/// Answers "can this CID be retrieved?".
///
/// Sources are consulted cheapest first and the first definitive answer
/// wins: a fresh status record, the blob cache, the preferred gateway, the
/// pin list, then every gateway in configured order. Whatever the answer,
/// it is recorded so the next call inside the freshness window stays local.
#[derive(Debug, Clone)]
pub struct StatusChecker {
    http: reqwest::Client,
    gateways: GatewayList,
    cache: Arc<CacheStore>,
    resolver: GatewayResolver,
    pins: Option<PinClient>,
    timeout: Duration,
    freshness: Duration,
}

impl StatusChecker {
    pub fn new(
        http: reqwest::Client,
        gateways: GatewayList,
        cache: Arc<CacheStore>,
        resolver: GatewayResolver,
        pins: Option<PinClient>,
        timeout: Duration,
        freshness: Duration,
    ) -> Self {
        Self {
            http,
            gateways,
            cache,
            resolver,
            pins,
            timeout,
            freshness,
        }
    }

    /// `skip_cache` bypasses the status record and the blob cache but the
    /// answer is still recorded.
    pub async fn exists(&self, cid: &Cid, skip_cache: bool) -> bool {
        if !skip_cache {
            let now = self.cache.clock().now();
            let key = cid.clone();
            match persist::run(&self.cache, move |c| c.status(&key)).await {
                Ok(Some(entry)) if entry.checked_at.is_fresh(now, self.freshness) => {
                    tracing::debug!(cid = %cid, available = entry.available, "status cache hit");
                    return entry.available;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(cid = %cid, error = %e, "ignoring unreadable status entry"),
            }
            let key = cid.clone();
            match persist::run(&self.cache, move |c| Ok(c.contains(&key))).await {
                Ok(true) => return self.record(cid, true).await,
                Ok(false) => {}
                Err(e) => tracing::warn!(cid = %cid, error = %e, "cache lookup failed"),
            }
        }

        let preferred = self.resolver.preferred_gateway(false).await;
        match http::ranged_get(&self.http, &preferred.url_for(cid), self.timeout).await {
            Ok(_) => return self.record(cid, true).await,
            Err(e) => tracing::debug!(cid = %cid, gateway = %preferred, error = %e, "preferred gateway check failed"),
        }

        if let Some(pins) = &self.pins {
            match pins.is_pinned(cid).await {
                Ok(true) => return self.record(cid, true).await,
                Ok(false) => tracing::debug!(cid = %cid, "not pinned"),
                Err(e) => tracing::debug!(cid = %cid, error = %e, "pin check failed"),
            }
        }

        for gw in &self.gateways {
            match http::ranged_get(&self.http, &gw.url_for(cid), self.timeout).await {
                Ok(_) => return self.record(cid, true).await,
                Err(e) => tracing::debug!(cid = %cid, gateway = %gw, error = %e, "existence check failed"),
            }
        }

        tracing::info!(cid = %cid, gateways = self.gateways.len(), "content not found on any gateway");
        self.record(cid, false).await
    }

    async fn record(&self, cid: &Cid, available: bool) -> bool {
        let key = cid.clone();
        if let Err(e) = persist::run(&self.cache, move |c| c.put_status(&key, available)).await {
            tracing::warn!(cid = %cid, error = %e, "failed to record status");
        }
        available
    }
}
