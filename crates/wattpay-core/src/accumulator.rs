//! Running accumulation of power readings for one settlement window.

use serde::{Deserialize, Serialize};

use crate::error::{MeteringError, Result};
use crate::reading::Milliwatts;

/// Snapshot of one settlement period's accumulated readings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccumulationWindow {
    /// Sum of all admitted readings, in milliwatts.
    pub sum_mw: f64,

    /// Number of admitted readings.
    pub sample_count: u32,
}

impl AccumulationWindow {
    /// Whether the window holds no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// Holds the live window and enforces its capacity.
///
/// Once `sample_count` reaches the window size the accumulator is due and
/// refuses further samples until it is drained.
#[derive(Debug, Clone)]
pub struct Accumulator {
    window: AccumulationWindow,
    window_size: u32,
}

impl Accumulator {
    /// Create an empty accumulator for windows of `window_size` samples.
    ///
    /// # Errors
    ///
    /// Returns `MeteringError::InvalidWindowSize` if `window_size` is zero.
    pub fn new(window_size: u32) -> Result<Self> {
        if window_size == 0 {
            return Err(MeteringError::InvalidWindowSize(window_size));
        }
        Ok(Self {
            window: AccumulationWindow::default(),
            window_size,
        })
    }

    /// Admit one reading into the window.
    ///
    /// # Errors
    ///
    /// Returns `MeteringError::CapacityExceeded` if the window is already due.
    /// The window is left untouched in that case.
    pub fn add(&mut self, reading: Milliwatts) -> Result<()> {
        if self.is_due() {
            return Err(MeteringError::CapacityExceeded {
                capacity: self.window_size,
            });
        }
        self.window.sum_mw += reading.value();
        self.window.sample_count += 1;
        Ok(())
    }

    /// Whether the window is full and must be settled before the next sample.
    #[must_use]
    pub const fn is_due(&self) -> bool {
        self.window.sample_count == self.window_size
    }

    /// Take the current window and reset to empty.
    pub fn drain(&mut self) -> AccumulationWindow {
        std::mem::take(&mut self.window)
    }

    /// The live window, for inspection.
    #[must_use]
    pub const fn window(&self) -> &AccumulationWindow {
        &self.window
    }
}
