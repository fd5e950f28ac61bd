//! In-process stand-ins for the pinning service and the chain
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry_relay::bridges::{ChainError, ChainSubmitter, ContentPinner, PinError};
use telemetry_relay::{EncodedReading, RelayService, SubmissionReceipt};

pub const TEST_CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

/// Pinner that either always succeeds with [`TEST_CID`] or always fails.
pub struct FakePinner {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub records: Mutex<Vec<serde_json::Value>>,
}

impl FakePinner {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentPinner for FakePinner {
    async fn pin(&self, record: &serde_json::Value) -> Result<String, PinError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().push(record.clone());
        if self.fail {
            Err(PinError::Status {
                status: 503,
                body: "pinning service unavailable".to_string(),
            })
        } else {
            Ok(TEST_CID.to_string())
        }
    }
}

#[derive(Clone, Copy)]
pub enum ChainBehaviour {
    Confirm,
    /// Confirm after the given delay
    SlowConfirm(Duration),
    Timeout,
    Reject,
    Unreachable,
}

/// Submitter that records every call and answers per [`ChainBehaviour`].
pub struct FakeChain {
    pub behaviour: ChainBehaviour,
    pub submitted: Mutex<Vec<EncodedReading>>,
}

impl FakeChain {
    pub fn new(behaviour: ChainBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.submitted.lock().len()
    }
}

#[async_trait]
impl ChainSubmitter for FakeChain {
    async fn submit(&self, encoded: &EncodedReading) -> Result<SubmissionReceipt, ChainError> {
        let index = {
            let mut submitted = self.submitted.lock();
            submitted.push(encoded.clone());
            submitted.len() as u64
        };

        if let ChainBehaviour::SlowConfirm(delay) = self.behaviour {
            tokio::time::sleep(delay).await;
        }

        match self.behaviour {
            ChainBehaviour::Confirm | ChainBehaviour::SlowConfirm(_) => Ok(SubmissionReceipt {
                tx_hash: format!("0x{:064x}", index),
                block: 1_000 + index,
            }),
            ChainBehaviour::Timeout => Err(ChainError::ConfirmationTimeout {
                tx_hash: format!("0x{:064x}", index),
                waited_secs: 120,
            }),
            ChainBehaviour::Reject => Err(ChainError::SubmissionRejected(
                "replacement transaction underpriced".to_string(),
            )),
            ChainBehaviour::Unreachable => Err(ChainError::NetworkUnavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

pub fn relay_with(pinner: Arc<FakePinner>, chain: Arc<FakeChain>) -> RelayService {
    RelayService::new(pinner, chain)
}

pub fn reading_payload(device: &str, temperature: f64, humidity: f64, timestamp_ms: u64) -> serde_json::Value {
    serde_json::json!({
        "device_id": device,
        "temperature": temperature,
        "humidity": humidity,
        "timestamp_ms": timestamp_ms,
    })
}
