//! Meter configuration.

use serde::Deserialize;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use wattpay_core::{Address, MeteringError, SettlementPolicy};

use crate::ledger::TransferSettings;
use crate::source::SensorSpec;

/// Default samples per settlement window.
pub const DEFAULT_WINDOW_SIZE: u32 = 60;

/// Default payment units per milliwatt per tick.
pub const DEFAULT_PRICE_PER_MW: f64 = 0.2;

/// Default tick period in milliseconds.
pub const DEFAULT_SAMPLING_INTERVAL_MS: u64 = 1000;

/// Default wallet gateway URL.
pub const DEFAULT_LEDGER_API_URL: &str = "http://localhost:14265";

/// Where the ledger secrets file is looked for, in order.
pub const LEDGER_SECRET_PATHS: &[&str] = &[
    ".secrets/ledger.json",
    "wattpay/.secrets/ledger.json",
    "../.secrets/ledger.json",
];

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Metering parameters failed validation.
    #[error(transparent)]
    Metering(#[from] MeteringError),
}

/// Meter configuration loaded once at startup from environment variables and
/// an optional secrets file.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// Successful samples per settlement window (default: 60).
    pub window_size: u32,

    /// Payment units per milliwatt per tick (default: 0.2).
    pub price_per_mw: f64,

    /// Time between ticks (default: 1s).
    pub sampling_interval: Duration,

    /// Address every settlement is paid to.
    pub destination: Address,

    /// Power source to sample.
    pub sensor: SensorSpec,

    /// Wallet gateway URL.
    pub ledger_api_url: String,

    /// Wallet gateway credential (optional).
    pub ledger_api_key: Option<String>,

    /// Wallet gateway request timeout in seconds.
    pub ledger_timeout_seconds: u64,

    /// Tag, depth and difficulty for transfers.
    pub transfer: TransferSettings,

    /// Log settlements instead of submitting them.
    pub dry_run: bool,
}

/// Ledger secrets file structure.
#[derive(Debug, Deserialize)]
struct LedgerSecrets {
    api_url: String,
    #[serde(default)]
    api_key: Option<String>,
}

impl MeterConfig {
    /// Load configuration from the process environment and secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if a required setting is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(|key| std::env::var(key).ok(), LEDGER_SECRET_PATHS)
    }

    /// Load configuration from an arbitrary variable lookup and secrets paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a required setting is missing or any value is invalid.
    pub fn from_sources<F>(lookup: F, secret_paths: &[&str]) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (ledger_api_url, ledger_api_key) = load_ledger_secrets(&lookup, secret_paths);

        let destination = lookup("METER_DESTINATION_ADDRESS")
            .ok_or(ConfigError::Missing("METER_DESTINATION_ADDRESS"))?;
        let destination = parse_value("METER_DESTINATION_ADDRESS", &destination)?;

        let interval_ms: u64 = parse_var(
            &lookup,
            "METER_SAMPLING_INTERVAL_MS",
            DEFAULT_SAMPLING_INTERVAL_MS,
        )?;
        if interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "METER_SAMPLING_INTERVAL_MS",
                value: interval_ms.to_string(),
                reason: "must be positive".into(),
            });
        }

        let config = Self {
            window_size: parse_var(&lookup, "METER_WINDOW_SIZE", DEFAULT_WINDOW_SIZE)?,
            price_per_mw: parse_var(&lookup, "METER_PRICE_PER_MW", DEFAULT_PRICE_PER_MW)?,
            sampling_interval: Duration::from_millis(interval_ms),
            destination,
            sensor: parse_var(&lookup, "METER_SENSOR", SensorSpec::default())?,
            ledger_api_url,
            ledger_api_key,
            ledger_timeout_seconds: parse_var(&lookup, "LEDGER_TIMEOUT_SECONDS", 30)?,
            transfer: TransferSettings {
                tag: lookup("LEDGER_TAG")
                    .unwrap_or_else(|| wattpay_ledger::DEFAULT_TAG.to_string()),
                depth: parse_var(&lookup, "LEDGER_DEPTH", wattpay_ledger::DEFAULT_DEPTH)?,
                min_weight_magnitude: parse_var(
                    &lookup,
                    "LEDGER_MIN_WEIGHT_MAGNITUDE",
                    wattpay_ledger::DEFAULT_MIN_WEIGHT_MAGNITUDE,
                )?,
            },
            dry_run: lookup("METER_DRY_RUN")
                .map(|v| parse_bool("METER_DRY_RUN", &v))
                .transpose()?
                .unwrap_or(false),
        };

        config.policy()?;
        Ok(config)
    }

    /// Settlement policy for these parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the window size or price is invalid.
    pub fn policy(&self) -> Result<SettlementPolicy, MeteringError> {
        SettlementPolicy::new(self.window_size, self.price_per_mw)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

/// Load ledger gateway secrets from file or environment.
fn load_ledger_secrets<F>(lookup: &F, secret_paths: &[&str]) -> (String, Option<String>)
where
    F: Fn(&str) -> Option<String>,
{
    for path in secret_paths {
        match load_secrets_file::<LedgerSecrets>(path) {
            Ok(secrets) => {
                tracing::info!(path = %path, "Loaded ledger secrets from file");
                return (secrets.api_url, secrets.api_key);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path, error = %e, "Ignoring unreadable secrets file"),
        }
    }

    tracing::debug!("Ledger secrets file not found, using environment variables");
    (
        lookup("LEDGER_API_URL").unwrap_or_else(|| DEFAULT_LEDGER_API_URL.to_string()),
        lookup("LEDGER_API_KEY"),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    const ADDR: &str = "MICIKTVQFXDBZARARUUBXY9OBFDCOFBTYXGOWBWYFZIPYVZVPDLMBVKRF9EUSFASVECRT9PBVBMWMZWADPWZPDDLOD";

    fn load(vars: &[(&str, &str)]) -> Result<MeterConfig, ConfigError> {
        load_with_secrets(vars, &[])
    }

    fn load_with_secrets(
        vars: &[(&str, &str)],
        secret_paths: &[&str],
    ) -> Result<MeterConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        MeterConfig::from_sources(|key| vars.get(key).cloned(), secret_paths)
    }

    #[test]
    fn defaults_with_only_destination() {
        let config = load(&[("METER_DESTINATION_ADDRESS", ADDR)]).unwrap();

        assert_eq!(config.window_size, 60);
        assert!((config.price_per_mw - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.sampling_interval, Duration::from_secs(1));
        assert_eq!(config.destination.as_str(), ADDR);
        assert_eq!(
            config.sensor,
            SensorSpec::Hwmon(PathBuf::from(crate::source::DEFAULT_HWMON_PATH))
        );
        assert_eq!(config.ledger_api_url, DEFAULT_LEDGER_API_URL);
        assert!(config.ledger_api_key.is_none());
        assert_eq!(config.transfer, TransferSettings::default());
        assert!(!config.dry_run);
    }

    #[test]
    fn destination_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("METER_DESTINATION_ADDRESS")));
    }

    #[test]
    fn malformed_destination_is_rejected() {
        let err = load(&[("METER_DESTINATION_ADDRESS", "hello")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "METER_DESTINATION_ADDRESS",
                ..
            }
        ));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("METER_DESTINATION_ADDRESS", ADDR),
            ("METER_WINDOW_SIZE", "10"),
            ("METER_PRICE_PER_MW", "1.5"),
            ("METER_SAMPLING_INTERVAL_MS", "250"),
            ("METER_SENSOR", "fixed:5"),
            ("LEDGER_API_URL", "http://gateway:8080"),
            ("LEDGER_API_KEY", "secret"),
            ("LEDGER_TAG", "ROOM9TWELVE"),
            ("LEDGER_DEPTH", "4"),
            ("LEDGER_MIN_WEIGHT_MAGNITUDE", "14"),
            ("METER_DRY_RUN", "true"),
        ])
        .unwrap();

        assert_eq!(config.window_size, 10);
        assert!((config.price_per_mw - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.sampling_interval, Duration::from_millis(250));
        assert!(matches!(config.sensor, SensorSpec::Fixed(_)));
        assert_eq!(config.ledger_api_url, "http://gateway:8080");
        assert_eq!(config.ledger_api_key.as_deref(), Some("secret"));
        assert_eq!(config.transfer.tag, "ROOM9TWELVE");
        assert_eq!(config.transfer.depth, 4);
        assert_eq!(config.transfer.min_weight_magnitude, 14);
        assert!(config.dry_run);
    }

    #[test]
    fn zero_window_size_is_fatal() {
        let err = load(&[
            ("METER_DESTINATION_ADDRESS", ADDR),
            ("METER_WINDOW_SIZE", "0"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Metering(MeteringError::InvalidWindowSize(0))
        ));
    }

    #[test]
    fn negative_price_is_fatal() {
        let err = load(&[
            ("METER_DESTINATION_ADDRESS", ADDR),
            ("METER_PRICE_PER_MW", "-0.2"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Metering(MeteringError::InvalidPrice(_))
        ));
    }

    #[test]
    fn zero_interval_is_fatal() {
        let err = load(&[
            ("METER_DESTINATION_ADDRESS", ADDR),
            ("METER_SAMPLING_INTERVAL_MS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "METER_SAMPLING_INTERVAL_MS",
                ..
            }
        ));
    }

    #[test]
    fn bad_dry_run_flag_is_rejected() {
        let err = load(&[
            ("METER_DESTINATION_ADDRESS", ADDR),
            ("METER_DRY_RUN", "maybe"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "METER_DRY_RUN", .. }));
    }

    #[test]
    fn secrets_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(
            &path,
            r#"{"api_url": "https://wallet.example", "api_key": "from-file"}"#,
        )
        .unwrap();
        let path = path.to_string_lossy().to_string();

        let config = load_with_secrets(
            &[
                ("METER_DESTINATION_ADDRESS", ADDR),
                ("LEDGER_API_URL", "http://ignored"),
                ("LEDGER_API_KEY", "ignored"),
            ],
            &[path.as_str()],
        )
        .unwrap();

        assert_eq!(config.ledger_api_url, "https://wallet.example");
        assert_eq!(config.ledger_api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn invalid_secrets_file_falls_back_to_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();
        let path = path.to_string_lossy().to_string();

        let config = load_with_secrets(
            &[
                ("METER_DESTINATION_ADDRESS", ADDR),
                ("LEDGER_API_URL", "http://from-env"),
            ],
            &[path.as_str()],
        )
        .unwrap();

        assert_eq!(config.ledger_api_url, "http://from-env");
    }
}
