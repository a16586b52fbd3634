//! The metering-and-settlement loop.
//!
//! Each tick takes one reading. Successful readings go into the accumulator;
//! faulted ticks are logged and skipped without touching it. As soon as the
//! accumulator holds a full window the loop settles: it prices the window,
//! drains it, and hands the request to the ledger. The window is gone once
//! drained, so a failed payment or a window too large to price is reported and
//! the next window starts empty.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};
use wattpay_core::{
    AccumulationWindow, Accumulator, Address, Milliwatts, PaymentOutcome, Reading,
    SettlementPolicy, SettlementRequest,
};

use crate::config::ConfigError;
use crate::error::RunError;
use crate::ledger::Ledger;
use crate::source::PowerSource;

/// Where the loop is in its cycle.
///
/// `Settling` only lasts for the tick that completes a window, so between
/// ticks [`MeterLoop::state`] is always `Sampling`. Events emitted while
/// settling are recorded inside a span carrying `state = Settling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterState {
    /// Taking readings.
    Sampling,
    /// Pricing and paying a full window.
    Settling,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A reading was accumulated; the window is not yet full.
    Sampled(Reading),
    /// The sensor faulted; nothing was accumulated.
    Faulted {
        /// Why the sensor faulted.
        reason: String,
    },
    /// A reading completed the window and the window was settled.
    Settled(SettlementReport),
    /// A reading completed the window but its amount could not be
    /// represented; the window was discarded without calling the ledger.
    Unpriced {
        /// The discarded window.
        window: AccumulationWindow,
        /// Why pricing failed.
        reason: String,
    },
}

/// One settlement attempt and how it went.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReport {
    /// The priced window.
    pub request: SettlementRequest,
    /// What the ledger said.
    pub outcome: PaymentOutcome,
}

/// Counters over the life of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Readings accumulated.
    pub samples: u64,
    /// Ticks skipped because of a sensor fault.
    pub faults: u64,
    /// Settlements the ledger accepted.
    pub settlements: u64,
    /// Settlements the ledger did not accept, or that could not be priced.
    pub failed_settlements: u64,
    /// Sum of accepted settlement amounts.
    pub total_paid: u64,
}

/// Drives sampling and settlement for one node.
///
/// The loop owns its power source, ledger and accumulator outright; nothing
/// else can observe or mutate the live window.
pub struct MeterLoop<S, L> {
    source: S,
    ledger: L,
    accumulator: Accumulator,
    policy: SettlementPolicy,
    destination: Address,
    interval: Duration,
    state: MeterState,
    stats: MeterStats,
}

impl<S: PowerSource, L: Ledger> MeterLoop<S, L> {
    /// Create a loop in the `Sampling` state with an empty window.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is zero or the policy's window size
    /// cannot back an accumulator.
    pub fn new(
        source: S,
        ledger: L,
        policy: SettlementPolicy,
        destination: Address,
        interval: Duration,
    ) -> Result<Self, RunError> {
        if interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "METER_SAMPLING_INTERVAL_MS",
                value: "0".into(),
                reason: "must be positive".into(),
            }
            .into());
        }
        Ok(Self {
            source,
            ledger,
            accumulator: Accumulator::new(policy.window_size())?,
            policy,
            destination,
            interval,
            state: MeterState::Sampling,
            stats: MeterStats::default(),
        })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MeterState {
        self.state
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> MeterStats {
        self.stats
    }

    /// The accumulator, for inspection.
    #[must_use]
    pub const fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Run one tick: read, accumulate, and settle if the window filled up.
    ///
    /// # Errors
    ///
    /// Returns an error only on a contract violation (a sample offered to a
    /// full window). Sensor faults, unpriceable windows and payment failures
    /// are reported through the returned outcome.
    pub async fn tick(&mut self) -> Result<TickOutcome, RunError> {
        self.stats.ticks += 1;

        let power = match self.source.read().await {
            Ok(power) => power,
            Err(fault) => {
                self.stats.faults += 1;
                warn!(
                    error = %fault,
                    samples = self.accumulator.window().sample_count,
                    "Sensor fault, skipping tick"
                );
                return Ok(TickOutcome::Faulted {
                    reason: fault.to_string(),
                });
            }
        };

        let reading = self.accept(power)?;

        if self.accumulator.is_due() {
            self.state = MeterState::Settling;
            let span = info_span!("settlement", state = ?self.state);
            let outcome = self.settle().instrument(span).await;
            self.state = MeterState::Sampling;
            return Ok(outcome);
        }

        Ok(TickOutcome::Sampled(reading))
    }

    fn accept(&mut self, power: Milliwatts) -> Result<Reading, RunError> {
        let reading = Reading::now(power);
        info!(power_mw = power.value(), "Current power consumption: {power}");
        self.accumulator.add(power)?;
        self.stats.samples += 1;
        Ok(reading)
    }

    async fn settle(&mut self) -> TickOutcome {
        let priced = self.policy.settle(self.accumulator.window(), &self.destination);
        let window = self.accumulator.drain();

        let request = match priced {
            Ok(request) => request,
            Err(e) => {
                self.stats.failed_settlements += 1;
                error!(
                    samples = window.sample_count,
                    sum_mw = window.sum_mw,
                    destination = %self.destination,
                    error = %e,
                    "Window cannot be priced, window discarded"
                );
                return TickOutcome::Unpriced {
                    window,
                    reason: e.to_string(),
                };
            }
        };

        info!(
            settlement_id = %request.id,
            average_mw = request.average_mw,
            samples = request.sample_count,
            "Average power consumption: {:.3} mW",
            request.average_mw
        );
        info!(
            settlement_id = %request.id,
            amount = request.amount,
            destination = %request.destination,
            "Preparing payment"
        );

        let outcome = match self.ledger.pay(&request).await {
            Ok(confirmation) => {
                self.stats.settlements += 1;
                self.stats.total_paid = self.stats.total_paid.saturating_add(request.amount);
                info!(
                    settlement_id = %request.id,
                    bundle_hash = %confirmation.bundle_hash,
                    "Payment sent"
                );
                PaymentOutcome::Confirmed(confirmation)
            }
            Err(failure) => {
                self.stats.failed_settlements += 1;
                error!(
                    settlement_id = %request.id,
                    amount = request.amount,
                    destination = %request.destination,
                    samples = request.sample_count,
                    average_mw = request.average_mw,
                    error = %failure,
                    "Payment failed, window discarded"
                );
                PaymentOutcome::Failed {
                    reason: failure.to_string(),
                }
            }
        };

        TickOutcome::Settled(SettlementReport { request, outcome })
    }

    /// Tick at the configured interval until `shutdown` resolves.
    ///
    /// Cadence is approximate: settlement runs inline, and ticks missed while
    /// a payment is in flight are delayed rather than bunched. Samples in the
    /// unfinished window are discarded on shutdown.
    ///
    /// # Errors
    ///
    /// Returns the first contract violation raised by a tick.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<MeterStats, RunError>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            window_size = self.policy.window_size(),
            price_per_mw = self.policy.price_per_mw(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            destination = %self.destination,
            "Meter loop started"
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    let outcome = self.tick().await?;
                    debug!(?outcome, "Tick complete");
                }
            }
        }

        let pending = self.accumulator.window();
        info!(
            pending_samples = pending.sample_count,
            pending_mw = pending.sum_mw,
            ticks = self.stats.ticks,
            settlements = self.stats.settlements,
            failed_settlements = self.stats.failed_settlements,
            total_paid = self.stats.total_paid,
            "Meter loop stopped"
        );
        Ok(self.stats)
    }
}
