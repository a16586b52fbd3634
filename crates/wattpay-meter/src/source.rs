//! Power sources the meter samples from.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use wattpay_core::Milliwatts;

/// Default hwmon attribute for the first INA2xx-style power monitor.
pub const DEFAULT_HWMON_PATH: &str = "/sys/class/hwmon/hwmon0/power1_input";

/// A recoverable sensor failure. The tick that hit it is skipped.
#[derive(Debug, thiserror::Error)]
pub enum SensorFault {
    /// Reading the device failed.
    #[error("sensor I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device returned something that is not a number.
    #[error("unparseable sensor value: {raw:?}")]
    Parse {
        /// The raw contents read from the device.
        raw: String,
    },

    /// The device returned a negative or non-finite power value.
    #[error("sensor value out of range: {0} mW")]
    OutOfRange(f64),

    /// The device is present but cannot produce a reading right now.
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
}

/// Something that can produce one power reading per tick.
#[async_trait]
pub trait PowerSource: Send {
    /// Take one reading.
    ///
    /// # Errors
    ///
    /// Returns a `SensorFault` if no valid reading could be taken.
    async fn read(&mut self) -> Result<Milliwatts, SensorFault>;
}

#[async_trait]
impl<S: PowerSource + ?Sized> PowerSource for Box<S> {
    async fn read(&mut self) -> Result<Milliwatts, SensorFault> {
        (**self).read().await
    }
}

/// Reads a Linux hwmon `power*_input` attribute.
///
/// The kernel reports power in microwatts; the value is converted to milliwatts.
#[derive(Debug, Clone)]
pub struct HwmonPowerSource {
    path: PathBuf,
}

impl HwmonPowerSource {
    /// Create a source for the given attribute file.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl PowerSource for HwmonPowerSource {
    async fn read(&mut self) -> Result<Milliwatts, SensorFault> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let raw = contents.trim();
        let microwatts: f64 = raw.parse().map_err(|_| SensorFault::Parse {
            raw: raw.to_string(),
        })?;
        Milliwatts::from_microwatts(microwatts)
            .map_err(|_| SensorFault::OutOfRange(microwatts / 1000.0))
    }
}

/// Always reports the same power. For bench runs without hardware.
#[derive(Debug, Clone, Copy)]
pub struct FixedPowerSource {
    power: Milliwatts,
}

impl FixedPowerSource {
    /// Create a source that always returns `power`.
    #[must_use]
    pub const fn new(power: Milliwatts) -> Self {
        Self { power }
    }
}

#[async_trait]
impl PowerSource for FixedPowerSource {
    async fn read(&mut self) -> Result<Milliwatts, SensorFault> {
        Ok(self.power)
    }
}

/// Which power source to build, as written in configuration.
///
/// Accepted forms are `hwmon:<path>` and `fixed:<milliwatts>`.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSpec {
    /// A hwmon attribute file.
    Hwmon(PathBuf),
    /// A constant reading.
    Fixed(Milliwatts),
}

impl SensorSpec {
    /// Build the configured source.
    #[must_use]
    pub fn build(&self) -> Box<dyn PowerSource> {
        match self {
            Self::Hwmon(path) => Box::new(HwmonPowerSource::new(path)),
            Self::Fixed(power) => Box::new(FixedPowerSource::new(*power)),
        }
    }
}

impl Default for SensorSpec {
    fn default() -> Self {
        Self::Hwmon(PathBuf::from(DEFAULT_HWMON_PATH))
    }
}

impl FromStr for SensorSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some(("hwmon", path)) if !path.is_empty() => Ok(Self::Hwmon(PathBuf::from(path))),
            Some(("fixed", value)) => value
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|v| Milliwatts::new(v).ok())
                .map(Self::Fixed)
                .ok_or_else(|| format!("invalid fixed power value: {value:?}")),
            _ => Err(format!(
                "invalid sensor {s:?} (expected hwmon:<path> or fixed:<mW>)"
            )),
        }
    }
}
