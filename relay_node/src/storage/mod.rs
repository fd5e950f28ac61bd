//! Process-lifetime stores for accepted and confirmed readings.
//!
//! Nothing here survives a restart. Listing returns the whole log with no
//! pagination, so memory grows with every accepted reading.

pub mod memory;

pub use memory::AppendLog;

use crate::telemetry::{ConfirmedReading, Reading};

/// Every reading that passed validation, in arrival order.
pub type ReadingStore = AppendLog<Reading>;

/// Readings whose contract call was mined.
pub type ConfirmedStore = AppendLog<ConfirmedReading>;
