//! Power reading types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MeteringError, Result};

/// Instantaneous power in milliwatts.
///
/// Always finite and non-negative; the constructor rejects anything else so
/// the accumulator never has to.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Milliwatts(f64);

impl Milliwatts {
    /// Zero power.
    pub const ZERO: Self = Self(0.0);

    /// Create a reading value, rejecting negative, NaN and infinite input.
    ///
    /// # Errors
    ///
    /// Returns `MeteringError::InvalidReading` if the value is not a finite,
    /// non-negative number.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value >= 0.0 {
            // Normalize -0.0 so the sum never picks up a negative sign.
            Ok(Self(value + 0.0))
        } else {
            Err(MeteringError::InvalidReading(value))
        }
    }

    /// Convert from microwatts, the unit Linux hwmon exposes.
    ///
    /// # Errors
    ///
    /// Returns `MeteringError::InvalidReading` if the converted value is invalid.
    pub fn from_microwatts(microwatts: f64) -> Result<Self> {
        Self::new(microwatts / 1000.0)
    }

    /// Return the value in milliwatts.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Milliwatts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} mW", self.0)
    }
}

impl TryFrom<f64> for Milliwatts {
    type Error = MeteringError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Milliwatts> for f64 {
    fn from(power: Milliwatts) -> Self {
        power.0
    }
}

/// A single sensor observation, stamped when the tick took it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Measured power.
    pub power: Milliwatts,

    /// When the reading was taken.
    pub taken_at: DateTime<Utc>,
}

impl Reading {
    /// Create a reading stamped with the current time.
    #[must_use]
    pub fn now(power: Milliwatts) -> Self {
        Self {
            power,
            taken_at: Utc::now(),
        }
    }
}
