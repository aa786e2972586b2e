//! Preferred-gateway resolution.
//!
//! Two persisted records feed the answer: the preferred pointer, written by
//! a probe or by a successful fallback download, and the last probe result.
//! Either one short-circuits while it is younger than the freshness window
//! and still names a configured gateway. Otherwise the resolver probes and
//! persists the new result.

use std::sync::Arc;
use std::time::Duration;

use cidgate_core::{Gateway, GatewayHealth};
use cidgate_store::{CacheStore, PreferredGateway, Selection};

use crate::error::PersistError;
use crate::persist;
use crate::probe::GatewayProber;

#[derive(Debug, Clone)]
pub struct GatewayResolver {
    prober: GatewayProber,
    cache: Arc<CacheStore>,
    freshness: Duration,
}

impl GatewayResolver {
    pub fn new(prober: GatewayProber, cache: Arc<CacheStore>, freshness: Duration) -> Self {
        Self {
            prober,
            cache,
            freshness,
        }
    }

    /// The gateway to try first. Never fails: persistence errors are logged
    /// and treated as missing state.
    pub async fn preferred_gateway(&self, force_refresh: bool) -> Gateway {
        if !force_refresh {
            if let Some(gw) = self.cached_choice().await {
                return gw;
            }
        }
        self.refresh().await.ranked_gateway
    }

    /// Probe now and persist both the health record and the pointer.
    pub async fn refresh(&self) -> GatewayHealth {
        let health = self.prober.probe().await;
        let (probe_cid, record) = (self.prober.probe_cid().clone(), health.clone());
        let persisted = persist::run(&self.cache, move |c| c.put_gateway_health(&probe_cid, &record));
        if let Err(e) = persisted.await {
            tracing::warn!(error = %e, "failed to persist gateway health");
        }
        let pointer = PreferredGateway {
            gateway: health.ranked_gateway.clone(),
            selected_at: health.measured_at,
            selection: Selection::Probe,
        };
        if let Err(e) = persist::run(&self.cache, move |c| c.set_preferred_gateway(&pointer)).await {
            tracing::warn!(error = %e, "failed to persist preferred gateway");
        }
        health
    }

    /// Make `gateway` the preferred one as of now, regardless of how fresh
    /// the current choice is.
    pub async fn promote(&self, gateway: &Gateway) -> Result<(), PersistError> {
        let pointer = PreferredGateway {
            gateway: gateway.clone(),
            selected_at: self.cache.clock().now(),
            selection: Selection::Promoted,
        };
        persist::run(&self.cache, move |c| c.set_preferred_gateway(&pointer)).await?;
        tracing::info!(gateway = %gateway, "promoted gateway");
        Ok(())
    }

    async fn cached_choice(&self) -> Option<Gateway> {
        let now = self.cache.clock().now();
        let gateways = self.prober.gateways();

        match persist::run(&self.cache, |c| c.preferred_gateway()).await {
            Ok(Some(p)) if p.selected_at.is_fresh(now, self.freshness) => {
                if let Some(gw) = gateways.find(p.gateway.base_url()) {
                    tracing::debug!(gateway = %gw, selection = ?p.selection, "using preferred gateway");
                    return Some(gw.clone());
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable preferred gateway"),
        }

        let probe_cid = self.prober.probe_cid().clone();
        match persist::run(&self.cache, move |c| c.gateway_health(&probe_cid)).await {
            Ok(Some(h)) if h.measured_at.is_fresh(now, self.freshness) => {
                let gw = gateways.find(h.ranked_gateway.base_url())?;
                tracing::debug!(gateway = %gw, "using cached probe result");
                Some(gw.clone())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable gateway health");
                None
            }
        }
    }
}
