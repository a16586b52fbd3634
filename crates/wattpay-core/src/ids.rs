//! Identifier types for wattpay.
//!
//! This module provides strongly-typed identifiers for ledger addresses and settlements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Length of a ledger address without checksum, in trytes.
pub const ADDRESS_LEN: usize = 81;

/// Length of a ledger address with its 9-tryte checksum.
pub const ADDRESS_WITH_CHECKSUM_LEN: usize = 90;

/// A ledger destination address.
///
/// Addresses are tryte strings: uppercase `A`-`Z` plus `9`, either 81 trytes
/// long or 90 trytes when the checksum is appended. The checksum is carried
/// through verbatim; verifying it is the wallet's job.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Return the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address carries a checksum suffix.
    #[must_use]
    pub fn has_checksum(&self) -> bool {
        self.0.len() == ADDRESS_WITH_CHECKSUM_LEN
    }
}

impl FromStr for Address {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != ADDRESS_LEN && s.len() != ADDRESS_WITH_CHECKSUM_LEN {
            return Err(IdError::InvalidAddressLength(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !is_tryte(*c)) {
            return Err(IdError::InvalidTryte(c));
        }
        Ok(Self(s.to_string()))
    }
}

fn is_tryte(c: char) -> bool {
    c == '9' || c.is_ascii_uppercase()
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// A settlement identifier using ULID for time-ordering.
///
/// Every settlement attempt gets one, successful or not, so a failed payment
/// can be matched against the logs when reconciling by hand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SettlementId(Ulid);

impl SettlementId {
    /// Generate a new `SettlementId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl FromStr for SettlementId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SettlementId({})", self.0)
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SettlementId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SettlementId> for String {
    fn from(id: SettlementId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The address is neither 81 nor 90 trytes long.
    #[error("invalid address length: {0} (expected 81 or 90 trytes)")]
    InvalidAddressLength(usize),

    /// The address contains a character outside `A-Z9`.
    #[error("invalid tryte in address: {0:?}")]
    InvalidTryte(char),

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}
