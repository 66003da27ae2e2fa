// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Out-of-band control of a running sweep.
//!
//! A [`DriverHandle`] is cheap to clone and safe to use from other threads.
//! Requests are flags polled by the driver at its yield points, and the
//! progress snapshot is republished at each of those same points, so a
//! reader always sees a consistent set of counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::combination::CombinationState;

/// Lifecycle of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverPhase {
    #[default]
    Initializing,
    Running,
    Interrupted,
    Exhausted,
}

/// Read-only view of sweep progress for presentation code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub phase: DriverPhase,
    pub total_tested: u64,
    pub session_tested: u64,
    pub found_count: usize,
    /// Last combination fully tested.
    pub current_state: Option<CombinationState>,
    /// Lexicographic position of `current_state`.
    pub current_rank: Option<u128>,
    /// `C(n, k)`; informational.
    pub total_combinations: Option<u128>,
}

impl ProgressSnapshot {
    /// Fraction of the whole search space covered, if it can be computed.
    pub fn fraction_done(&self) -> Option<f64> {
        let total = self.total_combinations?;
        if total == 0 {
            return Some(1.0);
        }
        let done = match self.current_rank {
            Some(rank) => rank + 1,
            None => 0,
        };
        Some(done as f64 / total as f64)
    }
}

#[derive(Debug, Default)]
struct Shared {
    cancel: AtomicBool,
    force_checkpoint: AtomicBool,
    snapshot: Mutex<ProgressSnapshot>,
}

#[derive(Debug, Clone, Default)]
pub struct DriverHandle {
    shared: Arc<Shared>,
}

impl DriverHandle {
    /// Ask the sweep to stop at its next yield point, after a final checkpoint.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Release);
    }

    /// Whether a cancellation request is pending.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.load(Ordering::Acquire)
    }

    /// Consume a pending cancellation request, so a later `run` proceeds.
    pub(crate) fn take_cancel(&self) -> bool {
        self.shared.cancel.swap(false, Ordering::AcqRel)
    }

    /// Ask for a checkpoint at the next yield point regardless of the interval.
    pub fn force_checkpoint(&self) {
        self.shared.force_checkpoint.store(true, Ordering::Release);
    }

    /// Consume a pending checkpoint request.
    pub(crate) fn take_force_checkpoint(&self) -> bool {
        self.shared.force_checkpoint.swap(false, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.shared.snapshot.lock().clone()
    }

    pub(crate) fn publish(&self, snapshot: ProgressSnapshot) {
        *self.shared.snapshot.lock() = snapshot;
    }
}
