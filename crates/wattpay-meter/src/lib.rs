//! Wattpay metering node.
//!
//! Samples a power sensor on a fixed tick, accumulates readings into
//! fixed-size windows, and pays for each completed window through a ledger.
//!
//! # Components
//!
//! - [`PowerSource`]: where readings come from (`hwmon`, fixed)
//! - [`Ledger`]: where payments go (wallet gateway, dry run)
//! - [`MeterLoop`]: the sampling/settlement state machine
//! - [`MeterConfig`]: startup configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod meter;
pub mod source;

pub use config::{ConfigError, MeterConfig};
pub use error::RunError;
pub use ledger::{DryRunLedger, GatewayLedger, Ledger, PaymentFailure, TransferSettings};
pub use meter::{MeterLoop, MeterState, MeterStats, SettlementReport, TickOutcome};
pub use source::{FixedPowerSource, HwmonPowerSource, PowerSource, SensorFault, SensorSpec};

use wattpay_ledger::{ClientOptions, LedgerClient};

/// Build the wallet gateway ledger from configuration.
///
/// # Errors
///
/// Returns an error if the gateway client cannot be constructed.
pub fn build_gateway(config: &MeterConfig) -> Result<GatewayLedger, RunError> {
    tracing::info!(ledger_url = %config.ledger_api_url, "Ledger gateway enabled");

    let client = LedgerClient::with_options(
        config.ledger_api_url.clone(),
        config.ledger_api_key.clone(),
        &ClientOptions::with_timeout_seconds(config.ledger_timeout_seconds),
    )?;
    Ok(GatewayLedger::new(client, config.transfer.clone()))
}

/// Build the ledger the configuration asks for.
///
/// # Errors
///
/// Returns an error if the gateway client cannot be constructed.
pub fn build_ledger(config: &MeterConfig) -> Result<Box<dyn Ledger>, RunError> {
    if config.dry_run {
        tracing::warn!("Dry run enabled - settlements will not be submitted");
        return Ok(Box::new(DryRunLedger));
    }
    Ok(Box::new(build_gateway(config)?))
}

/// Build a ready-to-run meter loop paying through `ledger`.
///
/// # Errors
///
/// Returns an error if the settlement policy or the loop cannot be built.
pub fn build_meter<L: Ledger>(
    config: &MeterConfig,
    ledger: L,
) -> Result<MeterLoop<Box<dyn PowerSource>, L>, RunError> {
    MeterLoop::new(
        config.sensor.build(),
        ledger,
        config.policy()?,
        config.destination.clone(),
        config.sampling_interval,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ADDR: &str = "MICIKTVQFXDBZARARUUBXY9OBFDCOFBTYXGOWBWYFZIPYVZVPDLMBVKRF9EUSFASVECRT9PBVBMWMZWADPWZPDDLOD";

    fn config(dry_run: &str) -> MeterConfig {
        let vars: HashMap<&str, &str> = [
            ("METER_DESTINATION_ADDRESS", ADDR),
            ("METER_WINDOW_SIZE", "1"),
            ("METER_SENSOR", "fixed:10"),
            ("METER_DRY_RUN", dry_run),
        ]
        .into_iter()
        .collect();
        MeterConfig::from_sources(|key| vars.get(key).map(|v| (*v).to_string()), &[]).unwrap()
    }

    #[tokio::test]
    async fn dry_run_meter_settles_every_window() {
        let config = config("true");
        let mut meter = build_meter(&config, build_ledger(&config).unwrap()).unwrap();

        match meter.tick().await.unwrap() {
            TickOutcome::Settled(report) => {
                assert_eq!(report.request.amount, 2);
                assert!(report.outcome.is_confirmed());
            }
            other => panic!("expected settlement, got {other:?}"),
        }
    }

    #[test]
    fn gateway_ledger_uses_configured_url() {
        let gateway = build_gateway(&config("false")).unwrap();
        assert_eq!(gateway.client().base_url(), "http://localhost:14265");
        assert!(build_ledger(&config("false")).is_ok());
    }
}
