//! Per-reading orchestration
//!
//! A reading moves through
//! `Received -> Validated -> Stored -> Pinned|PinFailed -> Encoded ->
//! Submitted|SubmissionFailed -> Responded`.
//! Validation failures stop before any side effect. Once a reading is
//! stored, submission is always attempted exactly once whatever the pin
//! outcome was.

use crate::bridges::{ChainError, ChainSubmitter, ContentPinner};
use crate::storage::{ConfirmedStore, ReadingStore};
use crate::telemetry::{
    validate_reading, ConfirmedReading, EncodedReading, RangeError, Reading, SubmissionReceipt,
    ValidationError,
};
use log::{debug, error, info, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("reading could not be encoded: {0}")]
    Encoding(#[from] RangeError),

    /// The reading was stored locally (and maybe pinned) but is not on-chain.
    #[error("chain submission failed: {source}")]
    Submission {
        #[source]
        source: ChainError,
        cid: String,
        pinned: bool,
    },
}

/// Result of a fully relayed reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub receipt: SubmissionReceipt,
    /// Empty when pinning failed
    pub cid: String,
    pub pinned: bool,
}

pub struct RelayService {
    readings: ReadingStore,
    confirmed: ConfirmedStore,
    pinner: Arc<dyn ContentPinner>,
    submitter: Arc<dyn ChainSubmitter>,
}

impl RelayService {
    pub fn new(pinner: Arc<dyn ContentPinner>, submitter: Arc<dyn ChainSubmitter>) -> Self {
        Self {
            readings: ReadingStore::new(),
            confirmed: ConfirmedStore::new(),
            pinner,
            submitter,
        }
    }

    /// Validate an untrusted payload and relay it.
    pub async fn handle(&self, payload: &serde_json::Value) -> Result<RelayOutcome, RelayError> {
        let reading = validate_reading(payload).map_err(|e| {
            debug!("Rejected payload: {}", e);
            e
        })?;
        self.relay(reading).await
    }

    /// Store, pin, encode and submit an already validated reading.
    pub async fn relay(&self, reading: Reading) -> Result<RelayOutcome, RelayError> {
        self.readings.append(reading.clone());

        let (cid, pinned) = match self.pinner.pin(&reading.pin_record()).await {
            Ok(cid) => (cid, true),
            Err(e) => {
                warn!(
                    "Pinning failed for device {}, submitting without CID: {}",
                    reading.device_id, e
                );
                (String::new(), false)
            }
        };

        let encoded = EncodedReading::from_reading(&reading, cid.clone())?;

        match self.submitter.submit(&encoded).await {
            Ok(receipt) => {
                info!(
                    "Reading from {} committed in block {} ({})",
                    reading.device_id, receipt.block, receipt.tx_hash
                );
                self.confirmed.append(ConfirmedReading {
                    reading,
                    cid: cid.clone(),
                    tx_hash: receipt.tx_hash.clone(),
                    block: receipt.block,
                });
                Ok(RelayOutcome {
                    receipt,
                    cid,
                    pinned,
                })
            }
            Err(e) => {
                error!(
                    "Chain submission failed for device {} [{}; retryable: {}]: {}",
                    reading.device_id,
                    e.kind(),
                    e.is_retryable(),
                    e
                );
                Err(RelayError::Submission {
                    source: e,
                    cid,
                    pinned,
                })
            }
        }
    }

    /// All accepted readings, in arrival order.
    pub fn readings(&self) -> Vec<Reading> {
        self.readings.list()
    }

    /// Readings confirmed on-chain, in confirmation order.
    pub fn confirmed(&self) -> Vec<ConfirmedReading> {
        self.confirmed.list()
    }

    pub fn stored_count(&self) -> usize {
        self.readings.len()
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }
}
