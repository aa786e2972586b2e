//! `cidgate probe`: re-rank the configured gateways and show the result.

use anyhow::{Context, Result};
use clap::Args;

use cidgate_client::GatewayClient;
use cidgate_core::GatewayHealth;

/// Arguments for `cidgate probe`.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Print the persisted health record as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run_probe(args: &ProbeArgs, client: &GatewayClient) -> Result<u8> {
    let health = client.probe().await;
    if args.json {
        let out = serde_json::to_string_pretty(&health).context("failed to encode probe result")?;
        println!("{out}");
    } else {
        print!("{}", render(&health, client.config().gateways.len()));
    }
    Ok(if health.any_responsive() { 0 } else { 1 })
}

fn render(health: &GatewayHealth, configured: usize) -> String {
    let mut out = String::new();
    if health.sample_latencies.is_empty() {
        out.push_str(&format!(
            "WARN: none of {configured} gateways responded; defaulting to {}\n",
            health.ranked_gateway
        ));
        return out;
    }
    for (rank, sample) in health.sample_latencies.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}. {:>6} ms  {}\n",
            rank + 1,
            sample.latency_ms,
            sample.gateway
        ));
    }
    let unresponsive = configured.saturating_sub(health.sample_latencies.len());
    if unresponsive > 0 {
        out.push_str(&format!("    {unresponsive} gateway(s) did not respond\n"));
    }
    out
}
