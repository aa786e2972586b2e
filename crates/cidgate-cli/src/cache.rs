//! # Cache Subcommand
//!
//! Local cache maintenance. These commands never touch the network.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use cidgate_store::{CacheStats, CacheStore};

/// Arguments for `cidgate cache`.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show entry count, size, and age range.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Evict every entry older than the configured maximum age.
    Sweep,
    /// Remove every cached entry.
    Clear,
}

pub fn run_cache(args: &CacheArgs, cache: &CacheStore) -> Result<u8> {
    match &args.command {
        CacheCommand::Stats { json } => {
            let stats = cache.stats();
            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&stats).context("failed to encode stats")?
                );
            } else {
                print!("{}", render_stats(&stats));
            }
        }
        CacheCommand::Sweep => {
            let evicted = cache.sweep_expired().context("cache sweep failed")?;
            let bytes: u64 = evicted.iter().map(|e| e.size).sum();
            println!("OK: evicted {} expired entries ({bytes} bytes)", evicted.len());
        }
        CacheCommand::Clear => {
            let removed = cache.clear().context("cache clear failed")?;
            println!("OK: removed {removed} entries");
        }
    }
    Ok(0)
}

fn render_stats(stats: &CacheStats) -> String {
    let pct = if stats.max_total_size_bytes == 0 {
        0.0
    } else {
        stats.total_bytes as f64 * 100.0 / stats.max_total_size_bytes as f64
    };
    let mut out = format!(
        "entries: {}/{}\nsize:    {}/{} bytes ({pct:.1}%)\n",
        stats.entries, stats.max_item_count, stats.total_bytes, stats.max_total_size_bytes
    );
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        out.push_str(&format!("oldest:  {oldest}\nnewest:  {newest}\n"));
    }
    out
}
