//! Ledgers the meter settles against.

use async_trait::async_trait;
use tracing::info;
use wattpay_core::{Confirmation, SettlementRequest};
use wattpay_ledger::{ClientError, LedgerClient, TransferRequest};

/// A failed settlement submission. Reported, never retried.
#[derive(Debug, thiserror::Error)]
pub enum PaymentFailure {
    /// The gateway client failed or the gateway returned an error.
    #[error("ledger client error: {0}")]
    Client(#[from] ClientError),

    /// The ledger refused the payment for a reason of its own.
    #[error("payment rejected: {0}")]
    Rejected(String),
}

/// Something that can submit a settlement payment.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit `request.amount` to `request.destination`.
    ///
    /// # Errors
    ///
    /// Returns a `PaymentFailure` if the payment was not accepted.
    async fn pay(&self, request: &SettlementRequest) -> Result<Confirmation, PaymentFailure>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for Box<L> {
    async fn pay(&self, request: &SettlementRequest) -> Result<Confirmation, PaymentFailure> {
        (**self).pay(request).await
    }
}

/// Transfer parameters the gateway needs beyond amount and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    /// Tag attached to every transfer.
    pub tag: String,
    /// Tip-selection depth.
    pub depth: u32,
    /// Proof-of-work difficulty.
    pub min_weight_magnitude: u32,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            tag: wattpay_ledger::DEFAULT_TAG.to_string(),
            depth: wattpay_ledger::DEFAULT_DEPTH,
            min_weight_magnitude: wattpay_ledger::DEFAULT_MIN_WEIGHT_MAGNITUDE,
        }
    }
}

/// Pays through the wallet gateway.
#[derive(Debug, Clone)]
pub struct GatewayLedger {
    client: LedgerClient,
    settings: TransferSettings,
}

impl GatewayLedger {
    /// Wrap a gateway client.
    #[must_use]
    pub const fn new(client: LedgerClient, settings: TransferSettings) -> Self {
        Self { client, settings }
    }

    /// The underlying client.
    #[must_use]
    pub const fn client(&self) -> &LedgerClient {
        &self.client
    }

    fn transfer_for(&self, request: &SettlementRequest) -> TransferRequest {
        TransferRequest {
            reference: request.id.to_string(),
            address: request.destination.to_string(),
            value: request.amount,
            tag: self.settings.tag.clone(),
            message: None,
            depth: self.settings.depth,
            min_weight_magnitude: self.settings.min_weight_magnitude,
        }
    }
}

#[async_trait]
impl Ledger for GatewayLedger {
    async fn pay(&self, request: &SettlementRequest) -> Result<Confirmation, PaymentFailure> {
        let receipt = self
            .client
            .send_transfer(&self.transfer_for(request))
            .await
            .map_err(|err| {
                if err.is_rejection() {
                    if let ClientError::Api { message, .. } = err {
                        return PaymentFailure::Rejected(message);
                    }
                }
                PaymentFailure::Client(err)
            })?;
        Ok(Confirmation::new(receipt.bundle_hash))
    }
}

/// Confirms every payment locally without touching a ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunLedger;

#[async_trait]
impl Ledger for DryRunLedger {
    async fn pay(&self, request: &SettlementRequest) -> Result<Confirmation, PaymentFailure> {
        info!(
            settlement_id = %request.id,
            amount = request.amount,
            destination = %request.destination,
            "Dry run: payment not submitted"
        );
        Ok(Confirmation::new(format!("DRYRUN-{}", request.id)))
    }
}
