//! Wattpay Meter - pays for measured power, one window at a time
//!
//! This is the main entry point for the metering node.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wattpay_ledger::LedgerClient;
use wattpay_meter::{build_gateway, build_ledger, build_meter, Ledger, MeterConfig, RunError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), RunError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wattpay_meter=debug,wattpay_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wattpay Meter");

    let config = MeterConfig::from_env()?;

    tracing::info!(
        window_size = config.window_size,
        price_per_mw = config.price_per_mw,
        sampling_interval_ms = u64::try_from(config.sampling_interval.as_millis()).unwrap_or(u64::MAX),
        destination = %config.destination,
        sensor = ?config.sensor,
        ledger_api_url = %config.ledger_api_url,
        ledger_authenticated = config.ledger_api_key.is_some(),
        dry_run = config.dry_run,
        "Meter configuration loaded"
    );

    let ledger: Box<dyn Ledger> = if config.dry_run {
        build_ledger(&config)?
    } else {
        let gateway = build_gateway(&config)?;
        probe_gateway(gateway.client()).await;
        Box::new(gateway)
    };

    let mut meter = build_meter(&config, ledger)?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    };

    let stats = meter.run_until(shutdown).await?;
    tracing::info!(?stats, "Wattpay Meter stopped");

    Ok(())
}

/// Check the gateway is reachable. A failure here is not fatal: the gateway
/// may come up before the first window is due.
async fn probe_gateway(client: &LedgerClient) {
    match client.node_info().await {
        Ok(info) => tracing::info!(
            app_name = %info.app_name,
            app_version = %info.app_version,
            latest_milestone_index = info.latest_milestone_index,
            "Ledger gateway reachable"
        ),
        Err(e) => tracing::warn!(error = %e, "Ledger gateway not reachable yet"),
    }
}
