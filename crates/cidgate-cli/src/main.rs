//! # cidgate CLI entry point
//!
//! Parses command-line arguments, installs logging, loads configuration,
//! and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cidgate_cli::cache::{run_cache, CacheArgs};
use cidgate_cli::content::{
    run_delete, run_exists, run_fetch, run_upload, DeleteArgs, ExistsArgs, FetchArgs, UploadArgs,
};
use cidgate_cli::gateway::{run_probe, ProbeArgs};

/// Fetch, upload, and check content-addressed blobs through HTTP gateways,
/// with a bounded local cache.
#[derive(Parser, Debug)]
#[command(name = "cidgate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// YAML configuration file. Without it, `CIDGATE_*` variables apply.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local cache directory (default: `$CIDGATE_CACHE_DIR`, then the user cache dir).
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Retrieve content by CID.
    Fetch(FetchArgs),
    /// Upload a file and print its CID.
    Upload(UploadArgs),
    /// Check whether a CID is retrievable.
    Exists(ExistsArgs),
    /// Drop a CID from the local cache and release its pin.
    Delete(DeleteArgs),
    /// Measure gateway latency and update the preferred gateway.
    Probe(ProbeArgs),
    /// Local cache maintenance.
    Cache(CacheArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!("cidgate v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("ERROR: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let settings = cidgate_cli::load_settings(cli.config.as_deref())?;
    let cache_dir = cli.cache_dir.unwrap_or_else(cidgate_cli::default_cache_dir);
    tracing::debug!(cache_dir = %cache_dir.display(), "resolved cache directory");

    let client = |settings| cidgate_cli::build_client(settings, &cache_dir);
    match &cli.command {
        Commands::Cache(args) => {
            let cache = cidgate_cli::open_cache(&cache_dir, settings.cache)?;
            run_cache(args, &cache)
        }
        Commands::Fetch(args) => run_fetch(args, &client(settings)?).await,
        Commands::Upload(args) => run_upload(args, &client(settings)?).await,
        Commands::Exists(args) => run_exists(args, &client(settings)?).await,
        Commands::Delete(args) => run_delete(args, &client(settings)?).await,
        Commands::Probe(args) => run_probe(args, &client(settings)?).await,
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` picks the level.
fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
