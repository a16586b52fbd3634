//! Error types for wattpay metering.

use crate::ids::IdError;

/// Result type for metering operations.
pub type Result<T> = std::result::Result<T, MeteringError>;

/// Errors that can occur in metering and settlement.
///
/// All of these are contract violations: they indicate a sequencing bug or a
/// bad configuration, never a transient runtime condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeteringError {
    /// A sample was added to a window that is already due for settlement.
    #[error("accumulation window is full: capacity={capacity}")]
    CapacityExceeded {
        /// Number of samples the window holds.
        capacity: u32,
    },

    /// Window size must be a positive number of samples.
    #[error("invalid window size: {0}")]
    InvalidWindowSize(u32),

    /// Price must be finite and non-negative.
    #[error("invalid price per milliwatt: {0}")]
    InvalidPrice(f64),

    /// Power readings must be finite and non-negative.
    #[error("invalid power reading: {0} mW")]
    InvalidReading(f64),

    /// The computed payment cannot be represented as a ledger amount.
    #[error("invalid settlement amount: {0}")]
    InvalidAmount(f64),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
