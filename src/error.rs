// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Crate-level error type.
//!
//! Only failures that stop a sweep from starting surface here. Everything
//! that can go wrong for a single combination, or for a single checkpoint
//! write, is absorbed and counted by the driver.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::combination::InvalidStateError;
use crate::config::ConfigError;
use crate::index::LoadError;
use crate::universe::UniverseError;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("cannot load index: {0}")]
    Index(#[from] LoadError),

    #[error("cannot load universe: {0}")]
    Universe(#[from] UniverseError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid search range: {0}")]
    InvalidRange(#[from] InvalidStateError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SweepError>;
