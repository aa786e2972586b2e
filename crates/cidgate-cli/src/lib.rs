//! # cidgate-cli: Command-Line Front End
//!
//! Provides the `cidgate` binary over `cidgate-client`.
//!
//! ## Subcommands
//!
//! - `cidgate fetch <CID> [-o FILE] [--skip-cache]`: retrieve content.
//! - `cidgate upload <FILE>`: add content and print its CID.
//! - `cidgate exists <CID> [--skip-cache]`: availability check.
//! - `cidgate delete <CID>`: drop from the local cache and unpin.
//! - `cidgate probe`: re-rank the configured gateways.
//! - `cidgate cache stats|sweep|clear`: local cache maintenance.
//!
//! Exit status is 0 on success, 1 when content is missing or an operation
//! fails. Progress goes to stderr; results go to stdout.

pub mod cache;
pub mod content;
pub mod gateway;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cidgate_client::{GatewayClient, Settings};
use cidgate_core::{ProgressReceiver, SystemClock};
use cidgate_store::{CacheConfig, CacheStore, FsKvStore};

/// Load settings from a YAML file when given, otherwise from `CIDGATE_*`
/// environment variables.
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    match config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => Settings::from_env().context("invalid CIDGATE_* environment"),
    }
}

/// Cache directory: `$CIDGATE_CACHE_DIR`, then `$XDG_CACHE_HOME/cidgate`,
/// then `$HOME/.cache/cidgate`, then `.cidgate` in the working directory.
pub fn default_cache_dir() -> PathBuf {
    cache_dir_from(|var| std::env::var_os(var).filter(|v| !v.is_empty()))
}

fn cache_dir_from(lookup: impl Fn(&str) -> Option<std::ffi::OsString>) -> PathBuf {
    if let Some(dir) = lookup("CIDGATE_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = lookup("XDG_CACHE_HOME") {
        return PathBuf::from(xdg).join("cidgate");
    }
    if let Some(home) = lookup("HOME") {
        return PathBuf::from(home).join(".cache").join("cidgate");
    }
    PathBuf::from(".cidgate")
}

/// Open the on-disk cache at `dir`, creating it if needed.
pub fn open_cache(dir: &Path, config: CacheConfig) -> Result<Arc<CacheStore>> {
    let kv = FsKvStore::open(dir)
        .with_context(|| format!("failed to open cache directory: {}", dir.display()))?;
    let store = CacheStore::open(Arc::new(kv), config, Arc::new(SystemClock))
        .with_context(|| format!("failed to load cache index: {}", dir.display()))?;
    Ok(Arc::new(store))
}

pub fn build_client(settings: Settings, cache_dir: &Path) -> Result<GatewayClient> {
    let cache = open_cache(cache_dir, settings.cache)?;
    GatewayClient::new(settings.client, cache).context("failed to build gateway client")
}

/// Print percentages to stderr as they arrive, until the sender is dropped.
pub fn spawn_progress_printer(label: String, mut rx: ProgressReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(pct) = rx.recv().await {
            eprint!("\r{label} {pct:>3}%");
        }
        eprintln!();
    })
}
