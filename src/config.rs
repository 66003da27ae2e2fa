// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search configuration.
//!
//! A [`SearchConfig`] can be read from a TOML file; every field has a
//! default, so a file only needs to name what it changes:
//!
//! ```toml
//! k = 6
//! checkpoint_interval_secs = 30
//! yield_every = 4096
//! verify_depth = "full"
//! checkpoint_path = "sweep.checkpoint.json"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Sortedness entries checked when nothing else is configured.
pub const DEFAULT_SAMPLE_DEPTH: usize = 1000;

/// Errors detected before a search starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("combination size k={k} exceeds universe size n={n}")]
    KExceedsUniverse { k: usize, n: usize },

    #[error("combination size k is not configured")]
    MissingK,

    #[error("yield_every must be at least 1")]
    ZeroYieldEvery,

    #[error("invalid verify depth '{0}' (expected 'full' or 'sample:<n>')")]
    InvalidVerifyDepth(String),

    #[error("I/O error reading {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("TOML parse error in {path}: {error}")]
    Parse {
        path: PathBuf,
        error: toml::de::Error,
    },
}

/// How much of a loaded index is checked for ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyDepth {
    /// Check only the first `n` entries.
    Sample(usize),
    /// Check every entry and count duplicates.
    Full,
}

impl Default for VerifyDepth {
    fn default() -> Self {
        VerifyDepth::Sample(DEFAULT_SAMPLE_DEPTH)
    }
}

impl fmt::Display for VerifyDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyDepth::Sample(n) => write!(f, "sample:{}", n),
            VerifyDepth::Full => write!(f, "full"),
        }
    }
}

impl FromStr for VerifyDepth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "full" {
            return Ok(VerifyDepth::Full);
        }
        s.strip_prefix("sample:")
            .and_then(|n| n.parse().ok())
            .map(VerifyDepth::Sample)
            .ok_or_else(|| ConfigError::InvalidVerifyDepth(s.to_string()))
    }
}

impl Serialize for VerifyDepth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VerifyDepth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Tunables for one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Combination size. Must be set before the search starts.
    pub k: Option<usize>,

    /// Seconds between periodic checkpoint saves.
    pub checkpoint_interval_secs: u64,

    /// Combinations tested between cooperative yield points.
    pub yield_every: u64,

    pub verify_depth: VerifyDepth,

    pub checkpoint_path: PathBuf,

    /// Append-only log of hits. Defaults to the checkpoint path with a
    /// `.found.jsonl` extension.
    pub found_log_path: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k: None,
            checkpoint_interval_secs: 60,
            yield_every: 1024,
            verify_depth: VerifyDepth::default(),
            checkpoint_path: PathBuf::from("sweep.checkpoint.json"),
            found_log_path: None,
        }
    }
}

impl SearchConfig {
    /// Read a configuration file. Missing fields take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        toml::from_str(&text).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Check the configuration against a universe of `n` symbols.
    ///
    /// Returns the combination size on success.
    pub fn validate(&self, n: usize) -> Result<usize, ConfigError> {
        let k = self.k.ok_or(ConfigError::MissingK)?;
        if k > n {
            return Err(ConfigError::KExceedsUniverse { k, n });
        }
        if self.yield_every == 0 {
            return Err(ConfigError::ZeroYieldEvery);
        }
        Ok(k)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }

    pub fn found_log_path(&self) -> PathBuf {
        self.found_log_path
            .clone()
            .unwrap_or_else(|| self.checkpoint_path.with_extension("found.jsonl"))
    }
}
