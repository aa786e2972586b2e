//! Gateway HTTP primitives shared by the prober, fetcher and status checker.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use cidgate_core::{Progress, ProgressWindow};
use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use tokio::time::Instant;

use crate::config::ConfigError;
use crate::error::GatewayError;

const USER_AGENT: &str = concat!("cidgate/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client. Timeouts are applied per request.
pub(crate) fn build_http() -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(ConfigError::HttpClient)
}

/// Request the first byte of `url`. Succeeds on 200 or 206 and returns the
/// time until response headers arrived.
pub(crate) async fn ranged_get(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Duration, GatewayError> {
    let started = Instant::now();
    let resp = http
        .get(url)
        .header(RANGE, "bytes=0-0")
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| GatewayError::from_reqwest(url, timeout, e))?;
    let elapsed = started.elapsed();

    match resp.status() {
        StatusCode::OK | StatusCode::PARTIAL_CONTENT => Ok(elapsed),
        other => Err(GatewayError::Status {
            url: url.to_string(),
            status: other.as_u16(),
        }),
    }
}

/// Download the full body of `url`, reporting progress inside `window`
/// proportionally to `Content-Length` when the gateway sends one.
pub(crate) async fn download(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
    progress: &Progress,
    window: ProgressWindow,
) -> Result<Bytes, GatewayError> {
    let resp = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| GatewayError::from_reqwest(url, timeout, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(GatewayError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let total = resp.content_length();
    let mut body = BytesMut::with_capacity(
        total.and_then(|t| usize::try_from(t).ok()).unwrap_or(0).min(64 * 1024 * 1024),
    );
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| GatewayError::from_reqwest(url, timeout, e))?;
        body.extend_from_slice(&chunk);
        progress.report(window.at(body.len() as u64, total));
    }
    progress.report(window.end());
    Ok(body.freeze())
}

/// `{api}/{op}` with exactly one separating slash.
pub(crate) fn api_endpoint(api: &url::Url, op: &str) -> String {
    format!("{}/{}", api.as_str().trim_end_matches('/'), op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_endpoint_joins_with_one_slash() {
        let api = url::Url::parse("http://node:5001/api/v0").unwrap();
        assert_eq!(api_endpoint(&api, "add"), "http://node:5001/api/v0/add");
        let api = url::Url::parse("http://node:5001/api/v0/").unwrap();
        assert_eq!(api_endpoint(&api, "pin/ls"), "http://node:5001/api/v0/pin/ls");
    }
}
