//! Cache-first content retrieval with sequential gateway fallback.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cidgate_core::{Cid, Gateway, GatewayList, Progress, ProgressWindow};
use cidgate_store::CacheStore;

use crate::error::{FetchError, GatewayError};
use crate::http;
use crate::persist;
use crate::resolver::GatewayResolver;

/// Progress while the preferred gateway downloads.
const PREFERRED_WINDOW: ProgressWindow = ProgressWindow::new(10, 90);
/// Progress shared out across the fallback list, one slice per gateway.
const FALLBACK_WINDOW: ProgressWindow = ProgressWindow::new(20, 90);

#[derive(Debug, Clone)]
pub struct ContentFetcher {
    http: reqwest::Client,
    gateways: GatewayList,
    cache: Arc<CacheStore>,
    resolver: GatewayResolver,
    timeout: Duration,
}

impl ContentFetcher {
    pub fn new(
        http: reqwest::Client,
        gateways: GatewayList,
        cache: Arc<CacheStore>,
        resolver: GatewayResolver,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            gateways,
            cache,
            resolver,
            timeout,
        }
    }

    /// Retrieve the bytes for `cid`.
    ///
    /// A cache hit returns without touching the network. Otherwise the
    /// preferred gateway is tried once, then every configured gateway in
    /// order, one at a time. The first success is written to the cache and,
    /// when it came from the fallback list, promoted to preferred.
    pub async fn fetch(
        &self,
        cid: &Cid,
        progress: &Progress,
        skip_cache: bool,
    ) -> Result<Bytes, FetchError> {
        progress.report(5);
        if !skip_cache {
            let key = cid.clone();
            match persist::run(&self.cache, move |c| c.get(&key)).await {
                Ok(Some(blob)) => {
                    tracing::debug!(cid = %cid, size = blob.len(), "cache hit");
                    progress.report(100);
                    return Ok(Bytes::from(blob));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(cid = %cid, error = %e, "cache read failed; fetching from network"),
            }
        }

        progress.report(10);
        let preferred = self.resolver.preferred_gateway(false).await;
        let mut last = match self.attempt(&preferred, cid, progress, PREFERRED_WINDOW).await {
            Ok(blob) => {
                self.store(cid, &blob).await;
                progress.report(100);
                return Ok(blob);
            }
            Err(e) => e,
        };
        let mut attempts = 1;

        let count = self.gateways.len();
        for (i, gw) in self.gateways.iter().enumerate() {
            match self.attempt(gw, cid, progress, FALLBACK_WINDOW.slice(i, count)).await {
                Ok(blob) => {
                    self.store(cid, &blob).await;
                    if let Err(e) = self.resolver.promote(gw).await {
                        tracing::warn!(gateway = %gw, error = %e, "failed to promote gateway");
                    }
                    progress.report(100);
                    return Ok(blob);
                }
                Err(e) => {
                    attempts += 1;
                    last = e;
                }
            }
        }

        tracing::warn!(cid = %cid, attempts, error = %last, "all gateways failed");
        Err(FetchError::Exhausted {
            cid: cid.clone(),
            attempts,
            last,
        })
    }

    async fn attempt(
        &self,
        gateway: &Gateway,
        cid: &Cid,
        progress: &Progress,
        window: ProgressWindow,
    ) -> Result<Bytes, GatewayError> {
        let url = gateway.url_for(cid);
        tracing::debug!(cid = %cid, gateway = %gateway, "downloading");
        let result = http::download(&self.http, &url, self.timeout, progress, window).await;
        if let Err(e) = &result {
            tracing::info!(cid = %cid, gateway = %gateway, error = %e, "gateway attempt failed");
        }
        result
    }

    /// Write-through after a network hit. The blob also settles any cached
    /// availability answer.
    async fn store(&self, cid: &Cid, blob: &Bytes) {
        let (key, bytes) = (cid.clone(), blob.clone());
        if let Err(e) = persist::run(&self.cache, move |c| c.insert(&key, &bytes)).await {
            tracing::warn!(cid = %cid, error = %e, "failed to cache blob");
        }
        let key = cid.clone();
        if let Err(e) = persist::run(&self.cache, move |c| c.put_status(&key, true)).await {
            tracing::warn!(cid = %cid, error = %e, "failed to record status");
        }
    }
}
