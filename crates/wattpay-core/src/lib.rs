//! Core types and logic for wattpay.
//!
//! This crate provides the pure, I/O-free part of the metering node:
//!
//! - **Readings**: `Milliwatts`, `Reading`
//! - **Accumulation**: `Accumulator`, `AccumulationWindow`
//! - **Settlement**: `SettlementPolicy`, `SettlementRequest`, `Confirmation`, `PaymentOutcome`
//! - **Identifiers**: `Address`, `SettlementId`
//!
//! # Payment Unit
//!
//! Readings are real-valued milliwatts. Payments are integers in the ledger's
//! smallest indivisible unit; fractional units are always truncated.
//!
//! - 60 readings averaging 10 mW at 0.2 units per mW per tick → 120 units
//! - A window worth 119.9988 units pays 119

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod accumulator;
pub mod error;
pub mod ids;
pub mod reading;
pub mod settlement;

pub use accumulator::{AccumulationWindow, Accumulator};
pub use error::{MeteringError, Result};
pub use ids::{Address, IdError, SettlementId};
pub use reading::{Milliwatts, Reading};
pub use settlement::{
    compute_amount, Confirmation, PaymentOutcome, SettlementPolicy, SettlementRequest,
};
