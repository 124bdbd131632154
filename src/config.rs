//! Harness configuration.
//!
//! Every tunable and every lookup table lives here and is handed to the
//! components that need it. Loaded from `--config <file>`, else from
//! `~/.polaris/audit.json` when present, else defaults. Partial files are
//! fine: missing fields keep their defaults.

use crate::engine::Timeouts;
use crate::selector::{SelectionConstraints, DEFAULT_MAX_ATTEMPTS};
use crate::verify::VerifierTables;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    Date(String),
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ConfigError::Date(s.to_string()))
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// Strict spot-check settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictConfig {
    /// Cities re-run under the strict strategy (most extreme + shuffled rest).
    pub sample_size: usize,
    pub shuffle_seed: u64,
}

impl Default for StrictConfig {
    fn default() -> Self {
        Self { sample_size: 5, shuffle_seed: 42 }
    }
}

/// Coordinate fuzzing settings. The seed is fixed and independent of the
/// date-derived city seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    pub samples: usize,
    pub seed: u64,
    pub date: NaiveDate,
    pub timezone: String,
    pub max_latitude: f64,
    pub max_longitude: f64,
    /// Ordering violations above this |latitude| are downgraded to WARN.
    pub polar_tolerance_latitude: f64,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            samples: 20,
            seed: 42,
            date: ymd(2026, 2, 14),
            timezone: "UTC".to_string(),
            max_latitude: 89.9,
            max_longitude: 179.9,
            polar_tolerance_latitude: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub city_secs: u64,
    pub coordinates_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { city_secs: 30, coordinates_secs: 15 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Path to the engine binary.
    pub engine: PathBuf,
    /// Appended to the run date to form the selection seed string.
    pub seed_salt: String,
    pub selection: SelectionConstraints,
    pub max_attempts: usize,
    /// Fixed calendar dates swept in addition to today.
    pub extreme_dates: Vec<NaiveDate>,
    pub strict: StrictConfig,
    pub fuzz: FuzzConfig,
    pub timeouts: TimeoutConfig,
    pub tables: VerifierTables,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine: PathBuf::from("target").join("release").join("polaris"),
            seed_salt: "polaris".to_string(),
            selection: SelectionConstraints::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            extreme_dates: vec![ymd(2026, 6, 21), ymd(2026, 12, 21)],
            strict: StrictConfig::default(),
            fuzz: FuzzConfig::default(),
            timeouts: TimeoutConfig::default(),
            tables: VerifierTables::default(),
        }
    }
}

impl HarnessConfig {
    /// Explicit path (errors propagate), else the default file if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let path = Self::default_path();
        if path.is_file() {
            log::info!("loading config from {}", path.display());
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// ~/.polaris/audit.json
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".polaris")
            .join("audit.json")
    }

    /// Seed string for a run date: `YYYY-MM-DD` + salt.
    pub fn seed_string(&self, date: NaiveDate) -> String {
        format!("{}{}", date.format("%Y-%m-%d"), self.seed_salt)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            city: Duration::from_secs(self.timeouts.city_secs),
            coordinates: Duration::from_secs(self.timeouts.coordinates_secs),
        }
    }
}
