//! Relay orchestration tests against in-process pinning and chain fakes

mod common;

use anyhow::Result;
use common::{reading_payload, relay_with, ChainBehaviour, FakeChain, FakePinner, TEST_CID};
use serde_json::json;
use telemetry_relay::bridges::ChainError;
use telemetry_relay::RelayError;

#[tokio::test]
async fn test_successful_relay() -> Result<()> {
    let pinner = FakePinner::working();
    let chain = FakeChain::new(ChainBehaviour::Confirm);
    let relay = relay_with(pinner.clone(), chain.clone());

    let outcome = relay
        .handle(&reading_payload("esp32-01", 150.0, 45.5, 1_731_000_000_000))
        .await?;

    assert_eq!(outcome.cid, TEST_CID);
    assert!(outcome.pinned);
    assert_eq!(outcome.receipt.block, 1_001);

    let submitted = chain.submitted.lock().clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].temperature_tenths, 1500);
    assert_eq!(submitted[0].humidity_tenths, 455);
    assert_eq!(submitted[0].cid, TEST_CID);

    let pinned = pinner.records.lock().clone();
    assert_eq!(pinned[0]["temperature_c"], 150.0);
    assert_eq!(pinned[0]["humidity_percent"], 45.5);

    assert_eq!(relay.readings().len(), 1);
    assert_eq!(relay.confirmed().len(), 1);
    assert_eq!(relay.confirmed()[0].tx_hash, outcome.receipt.tx_hash);
    Ok(())
}

#[tokio::test]
async fn test_missing_temperature_has_no_side_effects() -> Result<()> {
    let pinner = FakePinner::working();
    let chain = FakeChain::new(ChainBehaviour::Confirm);
    let relay = relay_with(pinner.clone(), chain.clone());

    let result = relay
        .handle(&json!({ "device_id": "esp32-01", "humidity": 40.0, "timestamp_ms": 1 }))
        .await;

    match result {
        Err(RelayError::Validation(e)) => assert_eq!(e.field, "temperature"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(pinner.calls(), 0);
    assert_eq!(chain.calls(), 0);
    assert!(relay.readings().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_pin_failure_degrades_to_empty_cid() -> Result<()> {
    let pinner = FakePinner::failing();
    let chain = FakeChain::new(ChainBehaviour::Confirm);
    let relay = relay_with(pinner.clone(), chain.clone());

    let outcome = relay
        .handle(&reading_payload("esp32-01", 21.0, 50.0, 1_731_000_000_000))
        .await?;

    assert_eq!(outcome.cid, "");
    assert!(!outcome.pinned);
    assert_eq!(pinner.calls(), 1);
    assert_eq!(chain.calls(), 1);
    assert_eq!(chain.submitted.lock()[0].cid, "");
    assert_eq!(relay.confirmed()[0].cid, "");
    Ok(())
}

#[tokio::test]
async fn test_confirmation_timeout_leaves_reading_unconfirmed() -> Result<()> {
    let pinner = FakePinner::working();
    let chain = FakeChain::new(ChainBehaviour::Timeout);
    let relay = relay_with(pinner.clone(), chain.clone());

    let result = relay
        .handle(&reading_payload("esp32-01", 21.0, 50.0, 1_731_000_000_000))
        .await;

    match result {
        Err(RelayError::Submission { source, cid, pinned }) => {
            assert!(matches!(source, ChainError::ConfirmationTimeout { .. }));
            assert!(source.is_retryable());
            assert_eq!(cid, TEST_CID);
            assert!(pinned);
        }
        other => panic!("expected submission error, got {:?}", other),
    }

    assert_eq!(relay.readings().len(), 1);
    assert!(relay.confirmed().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_submission_attempted_once_per_reading() -> Result<()> {
    let pinner = FakePinner::failing();
    let chain = FakeChain::new(ChainBehaviour::Reject);
    let relay = relay_with(pinner, chain.clone());

    let result = relay
        .handle(&reading_payload("esp32-01", 21.0, 50.0, 1))
        .await;

    assert!(matches!(
        result,
        Err(RelayError::Submission {
            source: ChainError::SubmissionRejected(_),
            ..
        })
    ));
    assert_eq!(chain.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_readings_listed_in_submission_order() -> Result<()> {
    let relay = relay_with(FakePinner::working(), FakeChain::new(ChainBehaviour::Confirm));

    for i in 0..5u64 {
        relay
            .handle(&reading_payload(&format!("device-{}", i), 20.0 + i as f64, 40.0, 1_000 + i))
            .await?;
    }

    let readings = relay.readings();
    assert_eq!(readings.len(), 5);
    for (i, reading) in readings.iter().enumerate() {
        assert_eq!(reading.device_id, format!("device-{}", i));
        assert_eq!(reading.timestamp_ms, 1_000 + i as u64);
    }
    Ok(())
}

#[tokio::test]
async fn test_stored_reading_keeps_original_units() -> Result<()> {
    let relay = relay_with(FakePinner::working(), FakeChain::new(ChainBehaviour::Unreachable));

    let _ = relay.handle(&json!({ "temperature": -4.25, "humidity": 61, "timestamp_ms": 7 })).await;

    let readings = relay.readings();
    assert_eq!(readings[0].device_id, "unknown-device");
    assert_eq!(readings[0].temperature, -4.25);
    assert_eq!(readings[0].humidity, 61.0);
    assert!(relay.confirmed().is_empty());
    Ok(())
}
