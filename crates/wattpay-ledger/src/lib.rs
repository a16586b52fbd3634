//! Wattpay ledger gateway client.
//!
//! This crate talks to the wallet gateway that holds the payer's seed, signs
//! value transfers, performs proof-of-work and broadcasts them. The metering
//! node never sees the seed; it authenticates with an API key.
//!
//! # Example
//!
//! ```no_run
//! use wattpay_ledger::{LedgerClient, TransferRequest};
//!
//! # async fn example() -> Result<(), wattpay_ledger::ClientError> {
//! let client = LedgerClient::new("http://localhost:14265", Some("gateway-key".into()))?;
//!
//! let receipt = client
//!     .send_transfer(&TransferRequest {
//!         reference: "01HZX3QK5Y8N9T2V4W6R7S8P0M".to_string(),
//!         address: "MICIKTVQFXDBZARARUUBXY9OBFDCOFBTYXGOWBWYFZIPYVZVPDLMBVKRF9EUSFASVECRT9PBVBMWMZWADPWZPDDLOD".to_string(),
//!         value: 120,
//!         tag: "HOTELIOTA".to_string(),
//!         message: None,
//!         depth: 3,
//!         min_weight_magnitude: 9,
//!     })
//!     .await?;
//!
//! println!("Bundle: {}", receipt.bundle_hash);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, LedgerClient};
pub use error::ClientError;
pub use types::*;
