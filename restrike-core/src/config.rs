//! Tunable knobs for the recovery subsystem.
//!
//! Configuration composes in three layers: hand-tuned defaults, an
//! optional TOML file, then `RESTRIKE_*` environment overrides. Every
//! field has a working default so embedders can start with
//! [`RecoveryConfig::default()`] and override nothing.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use restrike_model::{EncodeSettings, JobKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while composing a [`RecoveryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },
}

/// Top-level recovery configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Stale detection and abandonment policy.
    pub stale: StaleConfig,
    /// Retention window for completed job records.
    pub retention: RetentionConfig,
    /// Cadence of the periodic maintenance sweeper.
    pub sweep: SweepConfig,
    /// Artifact placement fallbacks.
    pub storage: StorageConfig,
    /// Encode parameters used when a job carries no usable settings.
    pub encode: EncodeDefaults,
}

impl RecoveryConfig {
    /// Composes defaults, an optional TOML file, then environment
    /// overrides. When `path` is `None` the `RESTRIKE_CONFIG` variable
    /// may name the file instead.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("RESTRIKE_CONFIG").ok().map(PathBuf::from));

        let mut config = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parses a TOML file. Absent sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = present(&lookup, "RESTRIKE_STALE_TIMEOUT_SECS") {
            self.stale.timeout_secs = parse_override("RESTRIKE_STALE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = present(&lookup, "RESTRIKE_STALE_ABANDON_MULTIPLIER") {
            self.stale.abandon_multiplier =
                parse_override("RESTRIKE_STALE_ABANDON_MULTIPLIER", &value)?;
        }
        if let Some(value) = present(&lookup, "RESTRIKE_RETENTION_COMPLETED_DAYS") {
            self.retention.completed_days =
                parse_override("RESTRIKE_RETENTION_COMPLETED_DAYS", &value)?;
        }
        if let Some(value) = present(&lookup, "RESTRIKE_SWEEP_INTERVAL_MS") {
            self.sweep.interval_ms = parse_override("RESTRIKE_SWEEP_INTERVAL_MS", &value)?;
        }
        if let Some(value) = present(&lookup, "RESTRIKE_SWEEP_CLEANUP_INTERVAL_MS") {
            self.sweep.cleanup_interval_ms =
                parse_override("RESTRIKE_SWEEP_CLEANUP_INTERVAL_MS", &value)?;
        }
        if let Some(value) = present(&lookup, "RESTRIKE_STORAGE_FALLBACK_ROOT") {
            self.storage.fallback_root = PathBuf::from(value);
        }
        Ok(())
    }
}

/// When a job without progress counts as stale, and when it is given up on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StaleConfig {
    /// Jobs with no progress for this long are considered stale.
    pub timeout_secs: i64,
    /// Stale beyond `abandon_multiplier * timeout` means the job is
    /// permanently stuck and gets failed instead of retried.
    pub abandon_multiplier: u32,
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            abandon_multiplier: 3,
        }
    }
}

impl StaleConfig {
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.timeout_secs)
    }

    /// Idle span past which a stale job is abandoned rather than resumed.
    pub fn abandon_after(&self, timeout: chrono::Duration) -> chrono::Duration {
        timeout * self.abandon_multiplier as i32
    }
}

/// How long completed job records are kept before bulk deletion.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetentionConfig {
    pub completed_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { completed_days: 30 }
    }
}

/// Cadence of the background sweeper.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweepConfig {
    /// Interval between incomplete and stale recovery passes.
    pub interval_ms: u64,
    /// Interval between retention cleanup passes. Runs on sweep ticks,
    /// so effective cadence rounds up to a sweep interval multiple.
    pub cleanup_interval_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5 * 60 * 1000,
            cleanup_interval_ms: 6 * 60 * 60 * 1000,
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }

    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cleanup_interval_ms)
    }
}

/// Placement fallbacks for when no storage folder is usable.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Local root for cache artifacts when no storage folder is active.
    pub fallback_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            fallback_root: PathBuf::from("./storage"),
        }
    }
}

/// Encode parameters applied when a job's settings blob is absent or
/// unparseable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EncodeDefaults {
    pub cache: EncodeSettings,
    pub thumbnail: EncodeSettings,
}

impl Default for EncodeDefaults {
    fn default() -> Self {
        Self {
            cache: EncodeSettings::cache_defaults(),
            thumbnail: EncodeSettings::thumbnail_defaults(),
        }
    }
}

impl EncodeDefaults {
    pub fn for_kind(&self, kind: JobKind) -> EncodeSettings {
        match kind {
            JobKind::Cache | JobKind::Both => self.cache,
            JobKind::Thumbnail => self.thumbnail,
        }
    }
}

fn present<F>(lookup: &F, key: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn parse_override<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        })
}
