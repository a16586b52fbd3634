//! Settlement pricing and payment outcome types.
//!
//! A completed window is priced by first taking its average power and then
//! multiplying back out by the window size and the price. The amount must be
//! derived from the average, not the raw sum: the two orders round
//! differently and can land on different sides of a whole unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accumulator::AccumulationWindow;
use crate::error::{MeteringError, Result};
use crate::ids::{Address, SettlementId};

/// Price an accumulated window in whole ledger units.
///
/// `amount = floor((sum_mw / window_size) * window_size * price_per_mw)`
///
/// # Errors
///
/// Returns `MeteringError::InvalidWindowSize` if `window_size` is zero,
/// `MeteringError::InvalidPrice` if the price is negative or not finite, and
/// `MeteringError::InvalidAmount` if the result does not fit a `u64`.
pub fn compute_amount(
    window: &AccumulationWindow,
    window_size: u32,
    price_per_mw: f64,
) -> Result<u64> {
    if window_size == 0 {
        return Err(MeteringError::InvalidWindowSize(window_size));
    }
    validate_price(price_per_mw)?;

    let size = f64::from(window_size);
    let average = window.sum_mw / size;
    let raw = average * size * price_per_mw;
    to_amount(raw)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn to_amount(raw: f64) -> Result<u64> {
    let floored = raw.floor();
    if !floored.is_finite() || floored < 0.0 || floored >= u64::MAX as f64 {
        return Err(MeteringError::InvalidAmount(raw));
    }
    Ok(floored as u64)
}

fn validate_price(price_per_mw: f64) -> Result<()> {
    if price_per_mw.is_finite() && price_per_mw >= 0.0 {
        Ok(())
    } else {
        Err(MeteringError::InvalidPrice(price_per_mw))
    }
}

/// Fixed-rate pricing for settlement windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementPolicy {
    window_size: u32,
    price_per_mw: f64,
}

impl SettlementPolicy {
    /// Create a policy, validating both parameters up front.
    ///
    /// # Errors
    ///
    /// Returns `MeteringError::InvalidWindowSize` or `MeteringError::InvalidPrice`.
    pub fn new(window_size: u32, price_per_mw: f64) -> Result<Self> {
        if window_size == 0 {
            return Err(MeteringError::InvalidWindowSize(window_size));
        }
        validate_price(price_per_mw)?;
        Ok(Self {
            window_size,
            price_per_mw,
        })
    }

    /// Samples per window.
    #[must_use]
    pub const fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Payment units per milliwatt per tick.
    #[must_use]
    pub const fn price_per_mw(&self) -> f64 {
        self.price_per_mw
    }

    /// Average power over a window, in milliwatts.
    #[must_use]
    pub fn average_mw(&self, window: &AccumulationWindow) -> f64 {
        window.sum_mw / f64::from(self.window_size)
    }

    /// Amount owed for a window.
    ///
    /// # Errors
    ///
    /// Returns `MeteringError::InvalidAmount` if the amount overflows.
    pub fn compute(&self, window: &AccumulationWindow) -> Result<u64> {
        compute_amount(window, self.window_size, self.price_per_mw)
    }

    /// Build the settlement request for a drained window.
    ///
    /// # Errors
    ///
    /// Returns `MeteringError::InvalidAmount` if the amount overflows.
    pub fn settle(
        &self,
        window: &AccumulationWindow,
        destination: &Address,
    ) -> Result<SettlementRequest> {
        let amount = self.compute(window)?;
        Ok(SettlementRequest {
            id: SettlementId::generate(),
            destination: destination.clone(),
            amount,
            average_mw: self.average_mw(window),
            sample_count: window.sample_count,
            created_at: Utc::now(),
        })
    }
}

/// A priced window ready to hand to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Unique settlement id, also used as the transfer reference.
    pub id: SettlementId,

    /// Where the payment goes.
    pub destination: Address,

    /// Amount in the ledger's smallest unit.
    pub amount: u64,

    /// Average power over the window, for display.
    pub average_mw: f64,

    /// Samples that went into the window.
    pub sample_count: u32,

    /// When the window was priced.
    pub created_at: DateTime<Utc>,
}

/// Opaque handle returned by the ledger for an accepted payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Bundle hash identifying the submitted transfer.
    pub bundle_hash: String,
}

impl Confirmation {
    /// Wrap a bundle hash.
    #[must_use]
    pub fn new(bundle_hash: impl Into<String>) -> Self {
        Self {
            bundle_hash: bundle_hash.into(),
        }
    }
}

/// Result of one settlement attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PaymentOutcome {
    /// The ledger accepted the payment.
    Confirmed(Confirmation),

    /// The ledger call failed; the window is not retried.
    Failed {
        /// Why submission failed.
        reason: String,
    },
}

impl PaymentOutcome {
    /// Whether the payment was accepted.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::Accumulator;
    use crate::reading::Milliwatts;

    const ADDR: &str = "MICIKTVQFXDBZARARUUBXY9OBFDCOFBTYXGOWBWYFZIPYVZVPDLMBVKRF9EUSFASVECRT9PBVBMWMZWADPWZPDDLOD";

    fn fill(window_size: u32, values: &[f64]) -> AccumulationWindow {
        let mut acc = Accumulator::new(window_size).unwrap();
        for value in values {
            acc.add(Milliwatts::new(*value).unwrap()).unwrap();
        }
        acc.drain()
    }

    #[test]
    fn ten_milliwatts_for_a_minute() {
        let window = fill(60, &[10.0; 60]);
        assert_eq!(compute_amount(&window, 60, 0.2).unwrap(), 120);
    }

    #[test]
    fn truncates_instead_of_rounding() {
        // 60 x 9.9999 accumulates to ~599.994, worth ~119.9988 units.
        let window = fill(60, &[9.9999; 60]);
        assert_eq!(compute_amount(&window, 60, 0.2).unwrap(), 119);
    }

    #[test]
    fn prices_through_the_average() {
        // sum 230 over 7 samples: (230 / 7) * 7 * 0.3 is just below 69,
        // whereas 230 * 0.3 is exactly 69.
        let window = fill(7, &[30.0, 30.0, 30.0, 30.0, 30.0, 40.0, 40.0]);
        assert_eq!(window.sum_mw, 230.0);
        assert_eq!((window.sum_mw * 0.3).floor(), 69.0);
        assert_eq!(compute_amount(&window, 7, 0.3).unwrap(), 68);
    }

    #[test]
    fn zero_window_prices_to_zero() {
        let window = fill(5, &[0.0; 5]);
        assert_eq!(compute_amount(&window, 5, 0.2).unwrap(), 0);
    }

    #[test]
    fn zero_window_size_is_rejected() {
        let window = AccumulationWindow::default();
        assert_eq!(
            compute_amount(&window, 0, 0.2),
            Err(MeteringError::InvalidWindowSize(0))
        );
        assert_eq!(
            SettlementPolicy::new(0, 0.2),
            Err(MeteringError::InvalidWindowSize(0))
        );
    }

    #[test]
    fn bad_prices_are_rejected() {
        assert!(SettlementPolicy::new(60, -0.1).is_err());
        assert!(SettlementPolicy::new(60, f64::NAN).is_err());
        assert!(SettlementPolicy::new(60, f64::INFINITY).is_err());
        assert!(SettlementPolicy::new(60, 0.0).is_ok());
    }

    #[test]
    fn overflowing_amount_is_rejected() {
        let window = AccumulationWindow {
            sum_mw: f64::MAX,
            sample_count: 1,
        };
        assert!(matches!(
            compute_amount(&window, 1, 2.0),
            Err(MeteringError::InvalidAmount(_))
        ));
    }

    #[test]
    fn settle_builds_request() {
        let policy = SettlementPolicy::new(4, 0.5).unwrap();
        let window = fill(4, &[2.0, 4.0, 6.0, 8.0]);
        let destination: Address = ADDR.parse().unwrap();

        let request = policy.settle(&window, &destination).unwrap();
        assert_eq!(request.amount, 10);
        assert_eq!(request.sample_count, 4);
        assert!((request.average_mw - 5.0).abs() < f64::EPSILON);
        assert_eq!(request.destination, destination);
    }

    #[test]
    fn payment_outcome_serializes_with_status_tag() {
        let outcome = PaymentOutcome::Failed {
            reason: "node unreachable".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "node unreachable");
        assert!(!outcome.is_confirmed());
    }
}
