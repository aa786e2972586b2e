//! Parallel latency probe across every configured gateway.

use std::sync::Arc;
use std::time::Duration;

use cidgate_core::{Cid, Clock, GatewayHealth, GatewayList, GatewaySample};
use futures::future::join_all;

use crate::http;

/// Measures gateway latency against a fixed probe CID.
///
/// Every gateway gets one ranged GET, all in flight at once, and the probe
/// waits for every one of them before ranking. Nothing is persisted here.
#[derive(Debug, Clone)]
pub struct GatewayProber {
    http: reqwest::Client,
    gateways: GatewayList,
    probe_cid: Cid,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl GatewayProber {
    pub fn new(
        http: reqwest::Client,
        gateways: GatewayList,
        probe_cid: Cid,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            gateways,
            probe_cid,
            timeout,
            clock,
        }
    }

    pub fn gateways(&self) -> &GatewayList {
        &self.gateways
    }

    pub fn probe_cid(&self) -> &Cid {
        &self.probe_cid
    }

    /// Probe all gateways and rank the responsive ones by latency.
    ///
    /// Ties keep configured order. When nothing answers, the first
    /// configured gateway is ranked by default and `sample_latencies` is
    /// empty.
    pub async fn probe(&self) -> GatewayHealth {
        let attempts = self.gateways.iter().map(|gw| async move {
            let url = gw.url_for(&self.probe_cid);
            match http::ranged_get(&self.http, &url, self.timeout).await {
                Ok(latency) => Some(GatewaySample {
                    gateway: gw.clone(),
                    latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                }),
                Err(e) => {
                    tracing::debug!(gateway = %gw, error = %e, "probe failed");
                    None
                }
            }
        });

        let mut samples: Vec<GatewaySample> = join_all(attempts).await.into_iter().flatten().collect();
        samples.sort_by_key(|s| (s.latency_ms, s.gateway.position()));

        let ranked_gateway = match samples.first() {
            Some(best) => best.gateway.clone(),
            None => {
                tracing::warn!(
                    gateways = self.gateways.len(),
                    "no gateway answered the probe; using the first configured gateway"
                );
                self.gateways.first().clone()
            }
        };
        tracing::info!(
            gateway = %ranked_gateway,
            responsive = samples.len(),
            "gateway probe complete"
        );

        GatewayHealth {
            ranked_gateway,
            measured_at: self.clock.now(),
            sample_latencies: samples,
        }
    }
}
