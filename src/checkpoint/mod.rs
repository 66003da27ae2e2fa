// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Durable sweep progress.
//!
//! A [`CheckpointRecord`] holds everything needed to continue a sweep: the
//! last combination tested, the cumulative tested counter, and every hit so
//! far. The [`CheckpointStore`] writes it as JSON, atomically: the record is
//! written to a temporary sibling file, synced, then renamed over the
//! previous checkpoint. A crash mid-write leaves the old checkpoint intact.
//!
//! Hits are additionally appended, one JSON object per line, to a separate
//! found log the moment they are discovered.
//!
//! Loading never fails: a missing checkpoint and an unreadable one both
//! produce `None`, the latter with a warning. Starting over is always safe.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::combination::CombinationState;
use crate::derive::Key;

/// Schema version written into every checkpoint.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error on {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("could not serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One derived key that was found in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedKey {
    /// Position of the key in the deriver's output.
    pub position: usize,
    pub key: Key,
}

/// A confirmed hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundRecord {
    pub combination: Vec<String>,
    pub matched_keys: Vec<MatchedKey>,
    /// Cumulative tested counter, including this combination.
    pub tested_at_count: u64,
}

/// Snapshot of sweep progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub version: u32,
    /// Universe size the state refers to.
    pub n: usize,
    /// Combination size the state refers to.
    pub k: usize,
    /// Last combination tested; `None` before the first test.
    pub state: Option<CombinationState>,
    pub total_tested: u64,
    pub found: Vec<FoundRecord>,
    /// The sweep reached the end of its range.
    pub exhausted: bool,
    /// For display only.
    pub saved_at: DateTime<Utc>,
}

impl CheckpointRecord {
    /// Structural checks that do not need an enumerator.
    fn validate(&self) -> Result<(), String> {
        if self.version != CHECKPOINT_VERSION {
            return Err(format!(
                "version {} (expected {})",
                self.version, CHECKPOINT_VERSION
            ));
        }
        if self.state.is_none() && self.total_tested != 0 {
            return Err(format!(
                "no state but {} combinations tested",
                self.total_tested
            ));
        }
        if let Some(found) = self
            .found
            .iter()
            .find(|found| found.tested_at_count > self.total_tested)
        {
            return Err(format!(
                "found record at count {} is beyond total {}",
                found.tested_at_count, self.total_tested
            ));
        }
        Ok(())
    }
}

/// Owner of the checkpoint file and the found log.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    found_log_path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf, found_log_path: PathBuf) -> Self {
        Self {
            path,
            found_log_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn found_log_path(&self) -> &Path {
        &self.found_log_path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Replace the stored checkpoint with `record`.
    pub fn save(&self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let tmp_path = self.tmp_path();

        let written = (|| {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()
        })();
        if let Err(error) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(CheckpointError::Io {
                path: tmp_path,
                error,
            });
        }

        if let Err(error) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CheckpointError::Io {
                path: self.path.clone(),
                error,
            });
        }

        debug!(
            path = %self.path.display(),
            total_tested = record.total_tested,
            found = record.found.len(),
            "checkpoint saved"
        );
        Ok(())
    }

    /// The stored checkpoint, if there is a usable one.
    pub fn load(&self) -> Option<CheckpointRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no checkpoint found; starting fresh");
                return None;
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "cannot read checkpoint; starting fresh");
                return None;
            }
        };

        let record: CheckpointRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "unparsable checkpoint; starting fresh");
                return None;
            }
        };

        if let Err(reason) = record.validate() {
            warn!(path = %self.path.display(), %reason, "invalid checkpoint; starting fresh");
            return None;
        }

        info!(
            path = %self.path.display(),
            total_tested = record.total_tested,
            found = record.found.len(),
            saved_at = %record.saved_at,
            "checkpoint restored"
        );
        Some(record)
    }

    /// Append one hit to the found log and sync it to disk.
    pub fn append_found(&self, found: &FoundRecord) -> Result<(), CheckpointError> {
        let mut line = serde_json::to_vec(found)?;
        line.push(b'\n');

        let path = &self.found_log_path;
        let result = (|| {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let mut out = BufWriter::new(file);
            out.write_all(&line)?;
            out.into_inner().map_err(|e| e.into_error())?.sync_all()
        })();
        result.map_err(|error| CheckpointError::Io {
            path: path.clone(),
            error,
        })
    }

    /// Every hit in the found log, in discovery order. Malformed lines are
    /// skipped with a warning.
    pub fn read_found_log(&self) -> Vec<FoundRecord> {
        let Ok(text) = fs::read_to_string(&self.found_log_path) else {
            return Vec::new();
        };
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(number, line)| match serde_json::from_str(line) {
                Ok(found) => Some(found),
                Err(error) => {
                    warn!(line = number + 1, %error, "skipping malformed found log entry");
                    None
                }
            })
            .collect()
    }
}
