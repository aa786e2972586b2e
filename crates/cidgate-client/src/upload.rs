//! Upload to the primary write API with a credentialed secondary fallback.
//!
//! The payload is streamed from memory as a multipart `file` part; nothing
//! is staged on disk. Uploads never touch the cache.

use std::time::Duration;

use bytes::Bytes;
use cidgate_core::{Cid, Progress, ProgressWindow};
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::config::ProjectCredentials;
use crate::error::{SecondaryAttempt, UploadError, WriteError};
use crate::http::api_endpoint;
use crate::pin::truncate;

const PRIMARY_WINDOW: ProgressWindow = ProgressWindow::new(20, 90);
const SECONDARY_WINDOW: ProgressWindow = ProgressWindow::new(30, 90);
const CHUNK_SIZE: usize = 64 * 1024;

/// Response keys that may carry the new content identifier, in lookup order.
const IDENTIFIER_KEYS: [&str; 3] = ["Hash", "hash", "cid"];

#[derive(Debug, Clone)]
pub struct Uploader {
    http: reqwest::Client,
    api_url: Url,
    secondary_api_url: Option<Url>,
    credentials: Option<ProjectCredentials>,
    timeout: Duration,
}

impl Uploader {
    pub fn new(
        http: reqwest::Client,
        api_url: Url,
        secondary_api_url: Option<Url>,
        credentials: Option<ProjectCredentials>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            api_url,
            secondary_api_url,
            credentials,
            timeout,
        }
    }

    /// Whether a failed primary upload will be retried on the secondary API.
    pub fn has_secondary(&self) -> bool {
        self.credentials.is_some() && self.secondary_api_url.is_some()
    }

    /// Upload `data` as `name` and return its content identifier.
    pub async fn upload(
        &self,
        data: Bytes,
        name: &str,
        progress: &Progress,
    ) -> Result<Cid, UploadError> {
        let primary = match self
            .add(&self.api_url, data.clone(), name, progress, PRIMARY_WINDOW)
            .await
        {
            Ok(cid) => {
                progress.report(100);
                return Ok(cid);
            }
            Err(e) => e,
        };

        let secondary = match (&self.credentials, &self.secondary_api_url) {
            (Some(_), Some(url)) => {
                tracing::warn!(error = %primary, "primary upload failed; trying secondary");
                match self.add(url, data, name, progress, SECONDARY_WINDOW).await {
                    Ok(cid) => {
                        progress.report(100);
                        return Ok(cid);
                    }
                    Err(e) => SecondaryAttempt::Failed(e),
                }
            }
            _ => {
                tracing::warn!(error = %primary, "primary upload failed; no secondary configured");
                SecondaryAttempt::NotConfigured
            }
        };

        Err(UploadError { primary, secondary })
    }

    async fn add(
        &self,
        api: &Url,
        data: Bytes,
        name: &str,
        progress: &Progress,
        window: ProgressWindow,
    ) -> Result<Cid, WriteError> {
        let endpoint = api_endpoint(api, "add");
        progress.report(window.start());

        let total = data.len() as u64;
        let part = Part::stream_with_length(
            reqwest::Body::wrap_stream(progress_stream(data, progress.clone(), window)),
            total,
        )
        .file_name(name.to_string());
        let form = Form::new().part("file", part);

        let mut req = self
            .http
            .post(&endpoint)
            .multipart(form)
            .timeout(self.timeout);
        if let Some(creds) = &self.credentials {
            req = req.basic_auth(&creds.project_id, Some(creds.project_secret.as_str()));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| WriteError::from_reqwest(&endpoint, self.timeout, e))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| WriteError::from_reqwest(&endpoint, self.timeout, e))?;
        if !status.is_success() {
            return Err(WriteError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let cid = extract_cid(&body).ok_or_else(|| WriteError::MissingIdentifier {
            endpoint: endpoint.clone(),
            body: truncate(&body),
        })?;
        tracing::info!(cid = %cid, endpoint = %endpoint, size = total, "uploaded");
        Ok(cid)
    }
}

/// Split `data` into chunks and report progress as each one is handed to
/// the transport.
fn progress_stream(
    data: Bytes,
    progress: Progress,
    window: ProgressWindow,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = data.len() as u64;
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(CHUNK_SIZE)
        .map(|start| data.slice(start..(start + CHUNK_SIZE).min(data.len())))
        .collect();
    let mut sent = 0u64;
    stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        progress.report(window.at(sent, Some(total)));
        Ok(chunk)
    })
}

/// Pull the content identifier out of an `add` response.
///
/// Accepts a single JSON object or newline-delimited objects (one per added
/// entry, the wrapping directory last); the last line carrying an identifier
/// wins. The value may be a plain string or a `{"/": "..."}` link.
pub fn extract_cid(body: &str) -> Option<Cid> {
    body.lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line.trim()).ok())
        .filter_map(|value| identifier_in(&value))
        .last()
        .or_else(|| {
            serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| identifier_in(&v))
        })
}

fn identifier_in(value: &serde_json::Value) -> Option<Cid> {
    let obj = value.as_object()?;
    IDENTIFIER_KEYS.iter().find_map(|key| {
        let raw = match obj.get(*key)? {
            serde_json::Value::String(s) => s.as_str(),
            serde_json::Value::Object(link) => link.get("/")?.as_str()?,
            _ => return None,
        };
        Cid::new(raw).ok()
    })
}
