// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search context combining fixed inputs and mutable progress.
//!
//! The SearchContext mirrors the two kinds of data a sweep touches:
//! - [`SearchInputs`]: the index and universe, immutable after load and
//!   shareable between independent sweeps via `Arc`
//! - [`Progress`]: the single-writer search position, counters and hits,
//!   owned by exactly one driver
//!
//! Partitioned sweeps each get their own context over the same inputs.

use std::sync::Arc;

use crate::checkpoint::FoundRecord;
use crate::combination::CombinationState;
use crate::index::FingerprintIndex;
use crate::state::Statistics;
use crate::universe::Universe;

/// Immutable inputs shared by every sweep over the same data.
#[derive(Debug, Clone)]
pub struct SearchInputs {
    pub index: Arc<FingerprintIndex>,
    pub universe: Arc<Universe>,
}

/// Mutable search position and derived bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// Last combination fully tested.
    pub last_tested: Option<CombinationState>,
    /// Next combination to test; `None` once the range is exhausted.
    pub next: Option<CombinationState>,
    /// Cumulative across runs.
    pub total_tested: u64,
    /// This process only.
    pub session_tested: u64,
    pub found: Vec<FoundRecord>,
}

#[derive(Debug)]
pub struct SearchContext {
    pub inputs: SearchInputs,
    pub progress: Progress,
    pub statistics: Statistics,
}

impl SearchContext {
    pub fn new(index: Arc<FingerprintIndex>, universe: Arc<Universe>) -> Self {
        Self {
            inputs: SearchInputs { index, universe },
            progress: Progress::default(),
            statistics: Statistics::new(),
        }
    }

    /// Universe size.
    pub fn n(&self) -> usize {
        self.inputs.universe.len()
    }
}
