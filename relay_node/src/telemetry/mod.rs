//! Reading types shared by the relay pipeline

pub mod scaling;
pub mod validation;

use serde::{Deserialize, Serialize};

pub use scaling::RangeError;
pub use validation::{validate_reading, ValidationError};

/// A sensor reading as accepted from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Device-supplied Unix time in milliseconds
    pub timestamp_ms: u64,
}

impl Reading {
    /// Record uploaded to the pinning service.
    pub fn pin_record(&self) -> serde_json::Value {
        serde_json::json!({
            "device_id": self.device_id,
            "temperature_c": self.temperature,
            "humidity_percent": self.humidity,
            "timestamp_ms": self.timestamp_ms,
        })
    }
}

/// Fixed-point form of a reading, ready for the contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedReading {
    pub device_id: String,
    pub temperature_tenths: i16,
    pub humidity_tenths: u16,
    pub timestamp_ms: u64,
    /// Empty when pinning failed
    pub cid: String,
}

impl EncodedReading {
    pub fn from_reading(reading: &Reading, cid: impl Into<String>) -> Result<Self, RangeError> {
        let (temperature_tenths, humidity_tenths) =
            scaling::encode(reading.temperature, reading.humidity)?;

        Ok(Self {
            device_id: reading.device_id.clone(),
            temperature_tenths,
            humidity_tenths,
            timestamp_ms: reading.timestamp_ms,
            cid: cid.into(),
        })
    }
}

/// Proof of inclusion for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// 0x-prefixed transaction hash
    pub tx_hash: String,
    pub block: u64,
}

/// A reading whose contract call was mined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedReading {
    #[serde(flatten)]
    pub reading: Reading,
    pub cid: String,
    pub tx_hash: String,
    pub block: u64,
}
