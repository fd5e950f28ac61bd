//! Validation of inbound reading payloads

use super::{scaling, Reading};
use log::warn;
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Device id used when the payload carries none.
pub const DEFAULT_DEVICE_ID: &str = "unknown-device";

/// Longest device id forwarded on-chain.
pub const MAX_DEVICE_ID_LEN: usize = 64;

/// Physically meaningful humidity. Values outside it are logged, not rejected.
pub const EXPECTED_HUMIDITY: RangeInclusive<f64> = 0.0..=100.0;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid field `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: Option<Value>,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>, value: Option<&Value>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            value: value.cloned(),
        }
    }
}

/// Turn an untrusted JSON body into a [`Reading`].
///
/// Every accepted reading is guaranteed to be encodable by
/// [`scaling::encode`].
pub fn validate_reading(payload: &Value) -> Result<Reading, ValidationError> {
    let body = payload
        .as_object()
        .ok_or_else(|| ValidationError::new("body", "expected a JSON object", None))?;

    let device_id = validate_device_id(body)?;
    let temperature = required_number(body, "temperature")?;
    let humidity = required_number(body, "humidity")?;
    let timestamp_ms = validate_timestamp(body)?;

    scaling::encode_temperature(temperature).map_err(|e| {
        ValidationError::new("temperature", e.to_string(), body.get("temperature"))
    })?;
    scaling::encode_humidity(humidity)
        .map_err(|e| ValidationError::new("humidity", e.to_string(), body.get("humidity")))?;

    if !EXPECTED_HUMIDITY.contains(&humidity) {
        warn!(
            "Device {} reported humidity {}% outside the expected 0-100% range",
            device_id, humidity
        );
    }

    Ok(Reading {
        device_id,
        temperature,
        humidity,
        timestamp_ms,
    })
}

fn validate_device_id(body: &Map<String, Value>) -> Result<String, ValidationError> {
    match body.get("device_id") {
        None | Some(Value::Null) => Ok(DEFAULT_DEVICE_ID.to_string()),
        Some(Value::String(id)) if id.trim().is_empty() => Ok(DEFAULT_DEVICE_ID.to_string()),
        Some(Value::String(id)) => {
            if id.chars().count() > MAX_DEVICE_ID_LEN {
                return Err(ValidationError::new(
                    "device_id",
                    format!("must be at most {} characters", MAX_DEVICE_ID_LEN),
                    body.get("device_id"),
                ));
            }
            Ok(id.clone())
        }
        Some(other) => Err(ValidationError::new(
            "device_id",
            "must be a string",
            Some(other),
        )),
    }
}

fn required_number(body: &Map<String, Value>, field: &str) -> Result<f64, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ValidationError::new(field, "is required", None)),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| ValidationError::new(field, "must be a number", Some(value))),
    }
}

fn validate_timestamp(body: &Map<String, Value>) -> Result<u64, ValidationError> {
    match body.get("timestamp_ms") {
        None | Some(Value::Null) => Err(ValidationError::new("timestamp_ms", "is required", None)),
        Some(value) => value.as_u64().or_else(|| whole_millis(value)).ok_or_else(|| {
            ValidationError::new(
                "timestamp_ms",
                "must be a non-negative integer of milliseconds",
                Some(value),
            )
        }),
    }
}

/// Some device serializers write integer milliseconds as `1731000000000.0`.
fn whole_millis(value: &Value) -> Option<u64> {
    let ms = value.as_f64()?;
    if ms.is_finite() && ms >= 0.0 && ms.fract() == 0.0 && ms < u64::MAX as f64 {
        Some(ms as u64)
    } else {
        None
    }
}
