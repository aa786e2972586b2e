//! Client configuration.
//!
//! Settings come from `CIDGATE_*` environment variables or a YAML file, and
//! are fixed for the life of the process. Defaults point at public IPFS
//! gateways and a local write node.
//!
//! `Debug` output redacts the project secret.

use std::path::Path;
use std::time::Duration;

use cidgate_core::{Cid, GatewayList, ValidationError, FRESHNESS_WINDOW};
use cidgate_store::CacheConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://ipfs.io/ipfs",
    "https://dweb.link/ipfs",
    "https://cloudflare-ipfs.com/ipfs",
    "https://gateway.pinata.cloud/ipfs",
];
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001/api/v0";
pub const DEFAULT_SECONDARY_API_URL: &str = "https://ipfs.infura.io:5001/api/v0";
/// The empty unixfs directory; every gateway can serve it.
pub const DEFAULT_PROBE_CID: &str = "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn";

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP Basic credentials for the write APIs.
#[derive(Clone)]
pub struct ProjectCredentials {
    pub project_id: String,
    pub project_secret: Zeroizing<String>,
}

impl ProjectCredentials {
    pub fn new(project_id: impl Into<String>, project_secret: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_secret: Zeroizing::new(project_secret.into()),
        }
    }
}

impl std::fmt::Debug for ProjectCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectCredentials")
            .field("project_id", &self.project_id)
            .field("project_secret", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for the gateway client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Read gateways in fallback order.
    pub gateways: GatewayList,
    /// Primary write API base, e.g. `http://127.0.0.1:5001/api/v0`.
    pub api_url: Url,
    /// Credentialed secondary write API; used only when `credentials` is set.
    pub secondary_api_url: Option<Url>,
    pub credentials: Option<ProjectCredentials>,
    /// Fixed CID fetched (one byte of) by every probe.
    pub probe_cid: Cid,
    pub probe_timeout: Duration,
    pub status_timeout: Duration,
    pub transfer_timeout: Duration,
    /// How long probe results, the preferred pointer, and status entries
    /// stay fresh.
    pub freshness: Duration,
}

impl ClientConfig {
    /// Configuration with default endpoints and the given gateways.
    pub fn new(gateways: GatewayList) -> Result<Self, ConfigError> {
        Ok(Self {
            gateways,
            api_url: parse_url("api_url", DEFAULT_API_URL)?,
            secondary_api_url: Some(parse_url("secondary_api_url", DEFAULT_SECONDARY_API_URL)?),
            credentials: None,
            probe_cid: Cid::new(DEFAULT_PROBE_CID)?,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            freshness: FRESHNESS_WINDOW,
        })
    }

    /// The endpoint that pin management talks to: the credentialed
    /// secondary API when configured, otherwise the primary.
    pub fn pin_api_url(&self) -> &Url {
        self.secondary_api_url.as_ref().unwrap_or(&self.api_url)
    }
}

/// Client and cache configuration loaded together.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub cache: CacheConfig,
}

impl Settings {
    /// Load from environment variables.
    ///
    /// Variables:
    /// - `CIDGATE_GATEWAYS`: comma-separated base URLs (default: public IPFS gateways)
    /// - `CIDGATE_API_URL` (default: `http://127.0.0.1:5001/api/v0`)
    /// - `CIDGATE_SECONDARY_API_URL` (default: `https://ipfs.infura.io:5001/api/v0`; empty disables)
    /// - `CIDGATE_PROJECT_ID` / `CIDGATE_PROJECT_SECRET`: both or neither
    /// - `CIDGATE_PROBE_CID`
    /// - `CIDGATE_PROBE_TIMEOUT_SECS` (default: 5), `CIDGATE_STATUS_TIMEOUT_SECS` (default: 5),
    ///   `CIDGATE_TRANSFER_TIMEOUT_SECS` (default: 60)
    /// - `CIDGATE_CACHE_MAX_BYTES`, `CIDGATE_CACHE_MAX_ITEMS`, `CIDGATE_CACHE_MAX_AGE_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup. Used by [`Settings::from_env`]
    /// and by tests that must not touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = ConfigFile {
            gateways: lookup("CIDGATE_GATEWAYS").map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            api_url: lookup("CIDGATE_API_URL"),
            secondary_api_url: lookup("CIDGATE_SECONDARY_API_URL"),
            project_id: lookup("CIDGATE_PROJECT_ID"),
            project_secret: lookup("CIDGATE_PROJECT_SECRET"),
            probe_cid: lookup("CIDGATE_PROBE_CID"),
            probe_timeout_secs: env_number(&lookup, "CIDGATE_PROBE_TIMEOUT_SECS")?,
            status_timeout_secs: env_number(&lookup, "CIDGATE_STATUS_TIMEOUT_SECS")?,
            transfer_timeout_secs: env_number(&lookup, "CIDGATE_TRANSFER_TIMEOUT_SECS")?,
            cache: CacheFile {
                max_total_size_bytes: env_number(&lookup, "CIDGATE_CACHE_MAX_BYTES")?,
                max_item_count: env_number(&lookup, "CIDGATE_CACHE_MAX_ITEMS")?,
                max_age_secs: env_number(&lookup, "CIDGATE_CACHE_MAX_AGE_SECS")?,
            },
        };
        raw.into_settings()
    }

    /// Parse a YAML document. Omitted keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: ConfigFile = serde_yaml::from_str(yaml)?;
        raw.into_settings()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&yaml)
    }
}

/// On-disk / environment shape before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    gateways: Option<Vec<String>>,
    api_url: Option<String>,
    secondary_api_url: Option<String>,
    project_id: Option<String>,
    project_secret: Option<String>,
    probe_cid: Option<String>,
    probe_timeout_secs: Option<u64>,
    status_timeout_secs: Option<u64>,
    transfer_timeout_secs: Option<u64>,
    cache: CacheFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CacheFile {
    max_total_size_bytes: Option<u64>,
    max_item_count: Option<usize>,
    max_age_secs: Option<u64>,
}

impl ConfigFile {
    fn into_settings(self) -> Result<Settings, ConfigError> {
        let gateways = match self.gateways {
            Some(urls) => GatewayList::from_urls(urls)?,
            None => GatewayList::from_urls(DEFAULT_GATEWAYS)?,
        };
        let mut client = ClientConfig::new(gateways)?;

        if let Some(api) = self.api_url {
            client.api_url = parse_url("api_url", &api)?;
        }
        if let Some(secondary) = self.secondary_api_url {
            client.secondary_api_url = if secondary.trim().is_empty() {
                None
            } else {
                Some(parse_url("secondary_api_url", &secondary)?)
            };
        }
        client.credentials = match (self.project_id, self.project_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(ProjectCredentials::new(id, secret))
            }
            (None, None) => None,
            (Some(id), Some(secret)) if id.is_empty() && secret.is_empty() => None,
            _ => return Err(ConfigError::IncompleteCredentials),
        };
        if let Some(cid) = self.probe_cid {
            client.probe_cid = Cid::new(cid)?;
        }
        if let Some(secs) = self.probe_timeout_secs {
            client.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.status_timeout_secs {
            client.status_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.transfer_timeout_secs {
            client.transfer_timeout = Duration::from_secs(secs);
        }

        let mut cache = CacheConfig::default();
        if let Some(bytes) = self.cache.max_total_size_bytes {
            cache.max_total_size_bytes = bytes;
        }
        if let Some(items) = self.cache.max_item_count {
            cache.max_item_count = items;
        }
        if let Some(secs) = self.cache.max_age_secs {
            cache.max_age = Duration::from_secs(secs);
        }

        Ok(Settings { client, cache })
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl(field.to_string(), e.to_string()))
}

fn env_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
    }
}

/// Configuration errors. These are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
    #[error("project id and project secret must be configured together")]
    IncompleteCredentials,
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
}
