//! Top-level error type for the metering node.
//!
//! Only conditions that should stop the process live here. Sensor faults and
//! payment failures are handled inside the loop and never surface as a
//! `RunError`.

use wattpay_core::MeteringError;
use wattpay_ledger::ClientError;

use crate::config::ConfigError;

/// Errors that stop the meter.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The ledger client could not be constructed.
    #[error("ledger client error: {0}")]
    Ledger(#[from] ClientError),

    /// A metering contract was violated.
    #[error("metering contract violated: {0}")]
    Metering(#[from] MeteringError),
}
