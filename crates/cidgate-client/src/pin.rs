//! Pin management on the write API. Every call here is best-effort: callers
//! log failures and carry on.

use std::time::Duration;

use cidgate_core::Cid;
use serde::Deserialize;
use url::Url;

use crate::config::ProjectCredentials;
use crate::error::WriteError;
use crate::http::api_endpoint;

/// Credentialed client for `pin/ls` and `pin/rm`.
#[derive(Debug, Clone)]
pub struct PinClient {
    http: reqwest::Client,
    api_url: Url,
    credentials: ProjectCredentials,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PinLsResponse {
    #[serde(rename = "Keys", default)]
    keys: serde_json::Map<String, serde_json::Value>,
}

impl PinClient {
    pub fn new(
        http: reqwest::Client,
        api_url: Url,
        credentials: ProjectCredentials,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            api_url,
            credentials,
            timeout,
        }
    }

    /// Whether the write API holds a pin for `cid`.
    ///
    /// A node that answers "not pinned" with an error status counts as a
    /// definitive `false`.
    pub async fn is_pinned(&self, cid: &Cid) -> Result<bool, WriteError> {
        let endpoint = api_endpoint(&self.api_url, "pin/ls");
        match self.post(&endpoint, cid).await {
            Ok(body) => {
                let parsed: PinLsResponse =
                    serde_json::from_str(&body).map_err(|_| WriteError::Status {
                        endpoint: endpoint.clone(),
                        status: 200,
                        body: truncate(&body),
                    })?;
                Ok(parsed.keys.contains_key(cid.as_str()))
            }
            Err(WriteError::Status { body, .. }) if body.contains("not pinned") => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove the pin for `cid`.
    pub async fn unpin(&self, cid: &Cid) -> Result<(), WriteError> {
        let endpoint = api_endpoint(&self.api_url, "pin/rm");
        self.post(&endpoint, cid).await?;
        tracing::info!(cid = %cid, "unpinned");
        Ok(())
    }

    async fn post(&self, endpoint: &str, cid: &Cid) -> Result<String, WriteError> {
        let resp = self
            .http
            .post(endpoint)
            .query(&[("arg", cid.as_str())])
            .basic_auth(
                &self.credentials.project_id,
                Some(self.credentials.project_secret.as_str()),
            )
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| WriteError::from_reqwest(endpoint, self.timeout, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| WriteError::from_reqwest(endpoint, self.timeout, e))?;
        if !status.is_success() {
            return Err(WriteError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate(&body),
            });
        }
        Ok(body)
    }
}

/// Keep error bodies short enough to log.
pub(crate) fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate("oops"), "oops");
        let long = "é".repeat(600);
        let cut = truncate(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 515);
    }

    #[test]
    fn pin_ls_response_parses_keys() {
        let parsed: PinLsResponse =
            serde_json::from_str(r#"{"Keys":{"QmA":{"Type":"recursive"}}}"#).unwrap();
        assert!(parsed.keys.contains_key("QmA"));
        let empty: PinLsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.keys.is_empty());
    }
}
