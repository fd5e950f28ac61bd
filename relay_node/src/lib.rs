//! Telemetry relay node
//!
//! Accepts sensor readings over HTTP, pins the raw record to IPFS through a
//! pinning service and commits a fixed-point summary of the reading to an
//! EVM contract with a transaction signed by the relay account.

pub mod api;
pub mod bridges;
pub mod config;
pub mod relay;
pub mod storage;
pub mod telemetry;

pub use relay::{RelayError, RelayOutcome, RelayService};
pub use telemetry::{ConfirmedReading, EncodedReading, Reading, SubmissionReceipt};
