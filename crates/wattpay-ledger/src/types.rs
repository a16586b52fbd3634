//! Request and response types for the ledger gateway.

use serde::{Deserialize, Serialize};

/// Default tip-selection depth for transfers.
pub const DEFAULT_DEPTH: u32 = 3;

/// Default proof-of-work difficulty for transfers.
pub const DEFAULT_MIN_WEIGHT_MAGNITUDE: u32 = 9;

/// Default transfer tag.
pub const DEFAULT_TAG: &str = "HOTELIOTA";

/// A value transfer to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Caller-chosen reference, used by the gateway for idempotency.
    pub reference: String,
    /// Receiving address.
    pub address: String,
    /// Amount in the ledger's smallest unit.
    pub value: u64,
    /// Transfer tag.
    pub tag: String,
    /// Optional message attached to the transfer.
    pub message: Option<String>,
    /// Tip-selection depth.
    pub depth: u32,
    /// Proof-of-work difficulty.
    pub min_weight_magnitude: u32,
}

/// Gateway response for an accepted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferReceipt {
    /// Hash of the broadcast bundle.
    pub bundle_hash: String,
    /// Hashes of the individual transactions in the bundle.
    #[serde(default)]
    pub transaction_hashes: Vec<String>,
}

/// Gateway node information.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    /// Node software name.
    pub app_name: String,
    /// Node software version.
    pub app_version: String,
    /// Latest milestone the node has seen.
    #[serde(default)]
    pub latest_milestone_index: u64,
}

/// Error body returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error message.
    pub error: String,
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,
}
