//! IPFS pinning through a bearer-authenticated REST pinning service

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

/// Response bodies longer than this are cut before landing in an error.
const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Error)]
pub enum PinError {
    #[error("pinning request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("pinning service responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed pinning response: {0}")]
    MalformedResponse(String),
}

/// Uploads JSON records to content-addressed storage.
#[async_trait]
pub trait ContentPinner: Send + Sync {
    /// Pin `record` and return its CID.
    async fn pin(&self, record: &serde_json::Value) -> Result<String, PinError>;
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Pinata-compatible `pinJSONToIPFS` client.
pub struct PinataPinner {
    client: reqwest::Client,
    endpoint: String,
    jwt: Zeroizing<String>,
}

impl PinataPinner {
    pub fn new(endpoint: impl Into<String>, jwt: Zeroizing<String>, timeout: Duration) -> Result<Self, PinError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            jwt,
        })
    }
}

impl fmt::Debug for PinataPinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinataPinner")
            .field("endpoint", &self.endpoint)
            .field("jwt", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl ContentPinner for PinataPinner {
    async fn pin(&self, record: &serde_json::Value) -> Result<String, PinError> {
        debug!("Pinning record to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.jwt.as_str())
            .json(record)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PinError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let parsed: PinResponse = serde_json::from_str(&body)
            .map_err(|e| PinError::MalformedResponse(e.to_string()))?;

        match parsed.ipfs_hash {
            Some(cid) if !cid.is_empty() => {
                info!("Record pinned, CID: {}", cid);
                Ok(cid)
            }
            _ => Err(PinError::MalformedResponse(
                "response carries no IpfsHash".to_string(),
            )),
        }
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
