//! # Content Subcommands
//!
//! `fetch`, `upload`, `exists`, and `delete`: thin wrappers over
//! [`GatewayClient`] that handle files, progress display, and exit codes.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use cidgate_client::{GatewayClient, UnpinStatus};
use cidgate_core::{Cid, Progress};

/// Arguments for `cidgate fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Content identifier to retrieve.
    pub cid: String,
    /// Write content here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Ignore the local cache and go to the network.
    #[arg(long)]
    pub skip_cache: bool,
    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for `cidgate upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Name sent with the upload (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for `cidgate exists`.
#[derive(Args, Debug)]
pub struct ExistsArgs {
    pub cid: String,
    /// Ignore cached answers and cached blobs.
    #[arg(long)]
    pub skip_cache: bool,
}

/// Arguments for `cidgate delete`.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub cid: String,
}

fn parse_cid(raw: &str) -> Result<Cid> {
    Cid::new(raw).with_context(|| format!("invalid CID: {raw:?}"))
}

fn progress_for(label: &str, quiet: bool) -> (Progress, Option<tokio::task::JoinHandle<()>>) {
    if quiet {
        return (Progress::silent(), None);
    }
    let (progress, rx) = Progress::channel();
    let printer = crate::spawn_progress_printer(label.to_string(), rx);
    (progress, Some(printer))
}

async fn finish_progress(progress: Progress, printer: Option<tokio::task::JoinHandle<()>>) {
    drop(progress);
    if let Some(handle) = printer {
        let _ = handle.await;
    }
}

pub async fn run_fetch(args: &FetchArgs, client: &GatewayClient) -> Result<u8> {
    let cid = parse_cid(&args.cid)?;
    let (progress, printer) = progress_for(&format!("fetching {cid}"), args.quiet);
    let result = client.fetch(&cid, &progress, args.skip_cache).await;
    finish_progress(progress, printer).await;

    let blob = match result {
        Ok(blob) => blob,
        Err(e) => {
            eprintln!("NOT FOUND: {e}");
            return Ok(1);
        }
    };
    write_output(args.output.as_deref(), &blob)?;
    tracing::info!(cid = %cid, size = blob.len(), "fetched");
    Ok(0)
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed to write output: {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data).context("failed to write to stdout")?;
            stdout.flush().context("failed to write to stdout")
        }
    }
}

pub async fn run_upload(args: &UploadArgs, client: &GatewayClient) -> Result<u8> {
    if !args.file.is_file() {
        bail!("file not found: {}", args.file.display());
    }
    let data = std::fs::read(&args.file)
        .with_context(|| format!("failed to read file: {}", args.file.display()))?;
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string()),
    };

    let (progress, printer) = progress_for(&format!("uploading {name}"), args.quiet);
    let result = client.upload(data, &name, &progress).await;
    finish_progress(progress, printer).await;

    let cid = result?;
    println!("{cid}");
    Ok(0)
}

pub async fn run_exists(args: &ExistsArgs, client: &GatewayClient) -> Result<u8> {
    let cid = parse_cid(&args.cid)?;
    if client.exists(&cid, args.skip_cache).await {
        println!("OK: {cid} is available");
        Ok(0)
    } else {
        println!("NOT FOUND: {cid}");
        Ok(1)
    }
}

pub async fn run_delete(args: &DeleteArgs, client: &GatewayClient) -> Result<u8> {
    let cid = parse_cid(&args.cid)?;
    let outcome = client.delete(&cid).await;
    let unpin = match &outcome.unpin {
        UnpinStatus::Unpinned => "unpinned".to_string(),
        UnpinStatus::NotConfigured => "no credentials; pin left in place".to_string(),
        UnpinStatus::Failed(e) => format!("unpin failed: {e}"),
    };
    println!(
        "OK: deleted {cid} (cache: {}, {unpin})",
        if outcome.removed_from_cache { "removed" } else { "not cached" }
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cidgate_client::ClientConfig;
    use cidgate_core::GatewayList;
    use cidgate_store::{CacheConfig, CacheStore, MemoryKvStore};

    /// A client whose gateway is unreachable, so only local state answers.
    fn offline_client() -> GatewayClient {
        let mut config =
            ClientConfig::new(GatewayList::from_urls(["http://127.0.0.1:1/ipfs"]).unwrap()).unwrap();
        config.secondary_api_url = None;
        config.api_url = "http://127.0.0.1:1/api/v0".parse().unwrap();
        config.probe_timeout = std::time::Duration::from_millis(200);
        config.status_timeout = std::time::Duration::from_millis(200);
        config.transfer_timeout = std::time::Duration::from_millis(200);
        let store = CacheStore::open(
            Arc::new(MemoryKvStore::new()),
            CacheConfig::default(),
            Arc::new(cidgate_core::SystemClock),
        )
        .unwrap();
        GatewayClient::new(config, Arc::new(store)).unwrap()
    }

    #[tokio::test]
    async fn fetch_writes_cached_content_to_file() {
        let client = offline_client();
        let cid = Cid::new("QmCached").unwrap();
        client.cache().insert(&cid, b"local bytes").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        let args = FetchArgs {
            cid: "QmCached".into(),
            output: Some(out.clone()),
            skip_cache: false,
            quiet: true,
        };
        assert_eq!(run_fetch(&args, &client).await.unwrap(), 0);
        assert_eq!(std::fs::read(&out).unwrap(), b"local bytes");
    }

    #[tokio::test]
    async fn fetch_of_unreachable_content_exits_one() {
        let client = offline_client();
        let args = FetchArgs {
            cid: "QmNowhere".into(),
            output: None,
            skip_cache: false,
            quiet: true,
        };
        assert_eq!(run_fetch(&args, &client).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_cid_is_an_error() {
        let client = offline_client();
        let args = ExistsArgs {
            cid: "bad/cid".into(),
            skip_cache: false,
        };
        assert!(run_exists(&args, &client).await.is_err());
    }

    #[tokio::test]
    async fn exists_uses_the_local_cache() {
        let client = offline_client();
        let cid = Cid::new("QmCached").unwrap();
        client.cache().insert(&cid, b"x").unwrap();
        let args = ExistsArgs {
            cid: "QmCached".into(),
            skip_cache: false,
        };
        assert_eq!(run_exists(&args, &client).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_an_error() {
        let client = offline_client();
        let args = UploadArgs {
            file: PathBuf::from("/nonexistent/file.bin"),
            name: None,
            quiet: true,
        };
        let err = run_upload(&args, &client).await.unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[tokio::test]
    async fn delete_without_credentials_succeeds() {
        let client = offline_client();
        let cid = Cid::new("QmCached").unwrap();
        client.cache().insert(&cid, b"x").unwrap();
        let args = DeleteArgs {
            cid: "QmCached".into(),
        };
        assert_eq!(run_delete(&args, &client).await.unwrap(), 0);
        assert!(!client.cache().contains(&cid));
    }
}
