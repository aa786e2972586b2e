//! # cidgate-client: Content Retrieval over IPFS-style Gateways
//!
//! Fetches immutable blobs by CID from a list of HTTP gateways, uploads new
//! blobs through a write API, and answers availability questions, all
//! backed by the bounded local cache in `cidgate-store`.
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`GatewayProber`] | Ranged GET against every gateway in parallel, ranked by latency |
//! | [`GatewayResolver`] | Fresh persisted choice, or probe and persist |
//! | [`ContentFetcher`] | Cache, then preferred gateway, then every gateway in order |
//! | [`Uploader`] | Primary `add`, credentialed secondary on failure |
//! | [`StatusChecker`] | Cached existence checks |
//! | [`PinClient`] | `pin/ls` and `pin/rm` |
//!
//! [`GatewayClient`] wires them together over one HTTP client and one
//! [`CacheStore`].
//!
//! ## Failure Policy
//!
//! A single gateway failing is never an error: fallback absorbs it.
//! Cache maintenance failures are logged and swallowed; none of the boundary
//! error types can carry a cache error. Only [`FetchError`] and
//! [`UploadError`] reach callers. Cache calls run on the blocking pool.

pub mod config;
pub mod error;
pub mod fetch;
pub(crate) mod http;
pub(crate) mod persist;
pub mod pin;
pub mod probe;
pub mod resolver;
pub mod status;
pub mod upload;

pub use config::{ClientConfig, ConfigError, ProjectCredentials, Settings};
pub use error::{FetchError, GatewayError, PersistError, SecondaryAttempt, UploadError, WriteError};
pub use fetch::ContentFetcher;
pub use pin::PinClient;
pub use probe::GatewayProber;
pub use resolver::GatewayResolver;
pub use status::StatusChecker;
pub use upload::{extract_cid, Uploader};

use std::sync::Arc;

use bytes::Bytes;
use cidgate_core::{Cid, Gateway, GatewayHealth, Progress};
use cidgate_store::CacheStore;

/// Result of [`GatewayClient::delete`].
#[derive(Debug)]
pub struct DeleteOutcome {
    /// Whether a cached blob was removed.
    pub removed_from_cache: bool,
    pub unpin: UnpinStatus,
}

/// What happened to the remote pin during a delete. None of these make the
/// delete fail.
#[derive(Debug)]
pub enum UnpinStatus {
    Unpinned,
    /// No credentials; nothing was attempted.
    NotConfigured,
    Failed(WriteError),
}

/// Top-level client. Holds one sub-client per operation.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    config: ClientConfig,
    cache: Arc<CacheStore>,
    resolver: GatewayResolver,
    fetcher: ContentFetcher,
    uploader: Uploader,
    status: StatusChecker,
    pins: Option<PinClient>,
}

impl GatewayClient {
    /// Build a client over `cache`. Time comes from the cache's clock.
    pub fn new(config: ClientConfig, cache: Arc<CacheStore>) -> Result<Self, ConfigError> {
        let http = http::build_http()?;

        let prober = GatewayProber::new(
            http.clone(),
            config.gateways.clone(),
            config.probe_cid.clone(),
            config.probe_timeout,
            cache.clock().clone(),
        );
        let resolver = GatewayResolver::new(prober, cache.clone(), config.freshness);
        let pins = config.credentials.clone().map(|creds| {
            PinClient::new(
                http.clone(),
                config.pin_api_url().clone(),
                creds,
                config.status_timeout,
            )
        });
        let fetcher = ContentFetcher::new(
            http.clone(),
            config.gateways.clone(),
            cache.clone(),
            resolver.clone(),
            config.transfer_timeout,
        );
        let uploader = Uploader::new(
            http.clone(),
            config.api_url.clone(),
            config.secondary_api_url.clone(),
            config.credentials.clone(),
            config.transfer_timeout,
        );
        let status = StatusChecker::new(
            http,
            config.gateways.clone(),
            cache.clone(),
            resolver.clone(),
            pins.clone(),
            config.status_timeout,
            config.freshness,
        );

        Ok(Self {
            config,
            cache,
            resolver,
            fetcher,
            uploader,
            status,
            pins,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn resolver(&self) -> &GatewayResolver {
        &self.resolver
    }

    pub fn pins(&self) -> Option<&PinClient> {
        self.pins.as_ref()
    }

    /// See [`ContentFetcher::fetch`].
    pub async fn fetch(
        &self,
        cid: &Cid,
        progress: &Progress,
        skip_cache: bool,
    ) -> Result<Bytes, FetchError> {
        self.fetcher.fetch(cid, progress, skip_cache).await
    }

    /// See [`Uploader::upload`].
    pub async fn upload(
        &self,
        data: impl Into<Bytes>,
        name: &str,
        progress: &Progress,
    ) -> Result<Cid, UploadError> {
        self.uploader.upload(data.into(), name, progress).await
    }

    /// See [`StatusChecker::exists`].
    pub async fn exists(&self, cid: &Cid, skip_cache: bool) -> bool {
        self.status.exists(cid, skip_cache).await
    }

    pub async fn preferred_gateway(&self, force_refresh: bool) -> Gateway {
        self.resolver.preferred_gateway(force_refresh).await
    }

    /// Re-probe every gateway and persist the result.
    pub async fn probe(&self) -> GatewayHealth {
        self.resolver.refresh().await
    }

    /// Drop `cid` from the local cache only.
    pub async fn remove(&self, cid: &Cid) -> Result<bool, PersistError> {
        let cid = cid.clone();
        persist::run(&self.cache, move |c| c.remove(&cid)).await
    }

    /// Forget `cid` locally and release its remote pin.
    ///
    /// Content is immutable, so a pin that cannot be released is reported
    /// in the outcome rather than failing the delete.
    pub async fn delete(&self, cid: &Cid) -> DeleteOutcome {
        let removed_from_cache = match self.remove(cid).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(cid = %cid, error = %e, "failed to remove cached blob");
                false
            }
        };
        let key = cid.clone();
        if let Err(e) = persist::run(&self.cache, move |c| c.remove_status(&key)).await {
            tracing::warn!(cid = %cid, error = %e, "failed to remove status entry");
        }

        let unpin = match &self.pins {
            None => UnpinStatus::NotConfigured,
            Some(pins) => match pins.unpin(cid).await {
                Ok(()) => UnpinStatus::Unpinned,
                Err(e) => {
                    tracing::warn!(cid = %cid, error = %e, "unpin failed; delete still succeeds");
                    UnpinStatus::Failed(e)
                }
            },
        };

        DeleteOutcome {
            removed_from_cache,
            unpin,
        }
    }
}
