//! Gateway client error types.
//!
//! Only [`FetchError`] and [`UploadError`] cross the public operation
//! boundary. [`GatewayError`] and [`WriteError`] describe one failed attempt
//! and are absorbed by fallback; they surface only as the `source` of a
//! boundary error. [`PersistError`] is the one cache-facing type and never
//! appears inside a boundary error.

use std::time::Duration;

use cidgate_core::Cid;
use cidgate_store::CacheError;

/// A single read attempt against one gateway failed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No response within the per-request timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    /// Transport failure (DNS, connection refused, reset, body read).
    #[error("HTTP error calling {url}: {source}")]
    Http { url: String, source: reqwest::Error },
    /// The gateway answered with an unacceptable status.
    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },
}

impl GatewayError {
    pub(crate) fn from_reqwest(url: &str, timeout: Duration, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Every gateway was tried and none returned the content.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{cid} not found: all {attempts} gateway attempts failed; last error: {last}")]
    Exhausted {
        cid: Cid,
        attempts: usize,
        #[source]
        last: GatewayError,
    },
}

impl FetchError {
    pub fn cid(&self) -> &Cid {
        match self {
            Self::Exhausted { cid, .. } => cid,
        }
    }
}

/// A single call to a write API (`add`, `pin/ls`, `pin/rm`) failed.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("request to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The response carried no `Hash`, `hash`, or `cid` field.
    #[error("{endpoint} response has no content identifier: {body}")]
    MissingIdentifier { endpoint: String, body: String },
}

impl WriteError {
    pub(crate) fn from_reqwest(endpoint: &str, timeout: Duration, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
                timeout,
            }
        } else {
            Self::Http {
                endpoint: endpoint.to_string(),
                source,
            }
        }
    }
}

/// What happened on the secondary write path.
#[derive(Debug)]
pub enum SecondaryAttempt {
    /// No credentials or no secondary URL; the primary failure is final.
    NotConfigured,
    Failed(WriteError),
}

impl std::fmt::Display for SecondaryAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("not configured"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// Both write paths failed, or neither returned a usable identifier.
#[derive(Debug, thiserror::Error)]
#[error("upload failed: primary: {primary}; secondary: {secondary}")]
pub struct UploadError {
    pub primary: WriteError,
    pub secondary: SecondaryAttempt,
}

/// A cache call made from async code failed.
///
/// Logged by the operation that made the call; never returned from fetch,
/// upload, or exists.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The blocking task panicked or was cancelled.
    #[error("cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
