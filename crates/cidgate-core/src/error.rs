//! # Validation Errors
//!
//! Structured errors for domain primitive construction, built with
//! `thiserror`. Each variant carries the rejected input so that operators
//! can diagnose misconfiguration without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// CID is empty, too long, or contains characters that cannot appear
    /// in a gateway URL path segment.
    #[error("invalid CID: \"{cid}\" ({reason})")]
    InvalidCid {
        /// The rejected input.
        cid: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Gateway base URL could not be parsed or is not http(s).
    #[error("invalid gateway URL: \"{url}\" ({reason})")]
    InvalidGatewayUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configured gateway list is empty.
    #[error("at least one gateway must be configured")]
    NoGateways,
}
