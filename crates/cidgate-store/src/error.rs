//! Cache maintenance errors.
//!
//! These never cross the fetch/upload/exists boundary: the client logs them
//! and degrades to the network path.

/// Errors from cache persistence and maintenance.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend I/O failure.
    #[error("I/O error on key {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },
    /// A stored record could not be decoded.
    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
    /// A record could not be encoded.
    #[error("failed to serialize record {key}: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }

    pub(crate) fn corrupt(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
