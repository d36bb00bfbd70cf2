//! Lookup of triage records from the patient service.
//!
//! Patient deletion asks the triage service whether any triage records exist
//! for a `dni`. The call goes through [`TriageLookup`] so handlers can be
//! exercised without network I/O.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("triage lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("triage lookup returned an unusable body: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait TriageLookup: Send + Sync {
    /// Triage list items recorded for `dni`, as returned by the triage service.
    async fn list_triage_records(&self, dni: &str) -> Result<Vec<JsonValue>, UpstreamError>;
}

#[derive(Deserialize)]
struct TriageListBody {
    items: Vec<JsonValue>,
}

/// `GET {base}/triajes?dni={dni}` against the triage service
#[derive(Clone)]
pub struct HttpTriageLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTriageLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl TriageLookup for HttpTriageLookup {
    async fn list_triage_records(&self, dni: &str) -> Result<Vec<JsonValue>, UpstreamError> {
        let url = format!("{}/triajes", self.base_url);
        let body = self
            .client
            .get(&url)
            .query(&[("dni", dni)])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let parsed: TriageListBody = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        tracing::debug!("Triage lookup for dni {} returned {} items", dni, parsed.items.len());
        Ok(parsed.items)
    }
}
