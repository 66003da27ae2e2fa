// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Resumable sweep driver.
//!
//! The driver walks the lexicographic order of k-combinations, derives keys
//! for each one through a [`KeyDeriver`], and looks every key's fingerprint
//! up in the [`FingerprintIndex`]. Progress is checkpointed so the sweep can
//! be stopped and continued without re-testing or skipping anything.
//!
//! # Lifecycle
//!
//! ```text
//! Initializing ──► Running ──┬──► Interrupted   (cancellation observed)
//!                            └──► Exhausted     (no further combination)
//! ```
//!
//! - **Initializing** (`new`/`initialize`): inputs are loaded (fatal on
//!   failure) and the checkpoint is restored (falls back to a fresh start).
//! - **Running** (`run`): combinations are tested in batches of
//!   `yield_every`. Between batches the driver reaches a yield point where it
//!   publishes a progress snapshot, honours a cancellation or forced
//!   checkpoint request, and saves a periodic checkpoint when due.
//! - **Interrupted / Exhausted**: a final checkpoint is written and a
//!   [`RunSummary`] returned. An interrupted driver may be `run` again.
//!
//! A hit is appended to the found log and followed by an immediate
//! checkpoint, independent of the periodic cadence.
//!
//! # Failure accounting
//!
//! Nothing that happens to a single combination stops the sweep. A
//! combination the deriver rejects is counted as invalid; one whose
//! derivation fails or panics is counted as a derivation error. Both are
//! still counted as tested, and neither is ever reported as a plain miss.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use comb_sweep::config::{SearchConfig, VerifyDepth};
//! use comb_sweep::derive::PhraseDeriver;
//! use comb_sweep::driver::{Outcome, SearchDriver};
//! use comb_sweep::index::{fingerprint_of, FingerprintIndex};
//! use comb_sweep::universe::Universe;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let universe: Universe = ["red", "green", "blue", "cyan"].into_iter().collect();
//! let index = FingerprintIndex::from_entries(
//!     vec![fingerprint_of(b"green blue")],
//!     VerifyDepth::Full,
//! );
//! let config = SearchConfig {
//!     k: Some(2),
//!     checkpoint_path: dir.path().join("sweep.json"),
//!     ..SearchConfig::default()
//! };
//!
//! let mut driver = SearchDriver::new(
//!     config,
//!     Arc::new(index),
//!     Arc::new(universe),
//!     Box::new(PhraseDeriver),
//! ).unwrap();
//! let summary = driver.run();
//! assert_eq!(summary.outcome, Outcome::Exhausted);
//! assert_eq!(summary.total_tested, 6);
//! assert_eq!(summary.found[0].combination, vec!["green", "blue"]);
//! ```

pub mod handle;

pub use handle::{DriverHandle, DriverPhase, ProgressSnapshot};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::checkpoint::{
    CheckpointRecord, CheckpointStore, FoundRecord, MatchedKey, CHECKPOINT_VERSION,
};
use crate::combination::{CombinationState, Enumerator, SearchRange};
use crate::config::SearchConfig;
use crate::context::{Progress, SearchContext};
use crate::derive::{DeriveError, Key, KeyDeriver};
use crate::error::Result;
use crate::index::{fingerprint_of, FingerprintIndex};
use crate::state::{Counters, Statistics};
use crate::universe::Universe;

/// How a call to [`SearchDriver::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Interrupted,
    Exhausted,
}

/// Terminal report of one `run`.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub total_tested: u64,
    pub session_tested: u64,
    /// Every hit, including those restored from the checkpoint.
    pub found: Vec<FoundRecord>,
    /// Counters for this session only.
    pub statistics: Statistics,
    pub elapsed: Duration,
}

/// Result of asking the deriver about one combination.
enum Derivation {
    Invalid,
    Keys(Vec<Key>),
    Failed(DeriveError),
}

/// Single-writer owner of one sweep's progress.
pub struct SearchDriver {
    ctx: SearchContext,
    enumerator: Enumerator,
    deriver: Box<dyn KeyDeriver>,
    store: CheckpointStore,
    config: SearchConfig,
    /// Exclusive upper bound of the range this driver owns.
    stop: Option<CombinationState>,
    handle: DriverHandle,
    phase: DriverPhase,
    restored: bool,
    last_checkpoint: Instant,
}

impl SearchDriver {
    /// Load the index and universe from disk, then build the driver.
    ///
    /// Failing to load either input is fatal.
    pub fn initialize(
        config: SearchConfig,
        index_path: &Path,
        universe_path: &Path,
        deriver: Box<dyn KeyDeriver>,
    ) -> Result<Self> {
        let index = FingerprintIndex::load_path(index_path, config.verify_depth)?;
        let universe = Universe::from_path(universe_path)?;
        Self::new(config, Arc::new(index), Arc::new(universe), deriver)
    }

    /// Build a driver over loaded inputs, restoring any usable checkpoint.
    pub fn new(
        config: SearchConfig,
        index: Arc<FingerprintIndex>,
        universe: Arc<Universe>,
        deriver: Box<dyn KeyDeriver>,
    ) -> Result<Self> {
        let n = universe.len();
        let k = config.validate(n)?;
        let enumerator = Enumerator::new(n, k)?;
        let store = CheckpointStore::new(config.checkpoint_path.clone(), config.found_log_path());

        let mut ctx = SearchContext::new(index, universe);
        let restored = restore(&enumerator, &store, &mut ctx.progress);
        if !restored {
            ctx.progress.next = Some(enumerator.first());
        }

        info!(
            n,
            k,
            total = ?enumerator.total(),
            restored,
            total_tested = ctx.progress.total_tested,
            deriver = deriver.name(),
            "sweep initialized"
        );

        let driver = Self {
            ctx,
            enumerator,
            deriver,
            store,
            config,
            stop: None,
            handle: DriverHandle::default(),
            phase: DriverPhase::Initializing,
            restored,
            last_checkpoint: Instant::now(),
        };
        driver.publish();
        Ok(driver)
    }

    /// Confine the sweep to `range`.
    ///
    /// A position restored from a checkpoint takes precedence over
    /// `range.start`; the stop bound always applies.
    pub fn with_range(mut self, range: SearchRange) -> Result<Self> {
        let start = self.enumerator.resume(range.start)?;
        if let Some(stop) = &range.stop {
            self.enumerator.resume(stop.clone())?;
        }
        if !self.restored {
            self.ctx.progress.next = Some(start);
        }
        self.stop = range.stop;
        self.publish();
        Ok(self)
    }

    /// Use an externally created handle, so collaborators built before the
    /// driver can control it.
    pub fn with_handle(mut self, handle: DriverHandle) -> Self {
        self.handle = handle;
        self.publish();
        self
    }

    pub fn handle(&self) -> DriverHandle {
        self.handle.clone()
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// Whether progress was restored from a checkpoint.
    pub fn restored(&self) -> bool {
        self.restored
    }

    pub fn progress(&self) -> &Progress {
        &self.ctx.progress
    }

    pub fn statistics(&self) -> &Statistics {
        &self.ctx.statistics
    }

    pub fn enumerator(&self) -> &Enumerator {
        &self.enumerator
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let progress = &self.ctx.progress;
        ProgressSnapshot {
            phase: self.phase,
            total_tested: progress.total_tested,
            session_tested: progress.session_tested,
            found_count: progress.found.len(),
            current_state: progress.last_tested.clone(),
            current_rank: progress
                .last_tested
                .as_ref()
                .and_then(|state| self.enumerator.rank(state)),
            total_combinations: self.enumerator.total(),
        }
    }

    fn publish(&self) {
        self.handle.publish(self.snapshot());
    }

    /// Test combinations until cancelled or exhausted.
    pub fn run(&mut self) -> RunSummary {
        let started = Instant::now();
        self.phase = DriverPhase::Running;
        self.last_checkpoint = started;
        info!(
            total_tested = self.ctx.progress.total_tested,
            next = ?self.ctx.progress.next,
            "sweep running"
        );

        let batch = self.config.yield_every.max(1);
        let outcome = 'sweep: loop {
            if self.yield_point() {
                break Outcome::Interrupted;
            }
            for _ in 0..batch {
                if !self.step() {
                    break 'sweep Outcome::Exhausted;
                }
            }
        };

        self.finish(outcome, started.elapsed())
    }

    /// Test the next combination and advance. Returns `false` when the range
    /// is exhausted.
    fn step(&mut self) -> bool {
        let Some(current) = self.ctx.progress.next.take() else {
            return false;
        };
        if let Some(stop) = &self.stop {
            if current >= *stop {
                return false;
            }
        }

        let hit = self.test(&current);

        // Reuse the previous state's buffer for the successor.
        let mut successor = match self.ctx.progress.last_tested.take() {
            Some(mut buffer) => {
                buffer.clone_from(&current);
                buffer
            }
            None => current.clone(),
        };
        self.ctx.progress.next = if self.enumerator.advance(&mut successor) {
            Some(successor)
        } else {
            None
        };
        self.ctx.progress.last_tested = Some(current);

        // Only now is the checkpoint position consistent with the counters.
        if hit {
            self.checkpoint(false);
        }
        true
    }

    /// Derive, fingerprint and look up one combination. Returns whether it hit.
    fn test(&mut self, current: &CombinationState) -> bool {
        let universe = Arc::clone(&self.ctx.inputs.universe);
        let symbols = universe.select(current);

        self.ctx.progress.total_tested += 1;
        self.ctx.progress.session_tested += 1;
        self.ctx.statistics.increment(Counters::Tested);

        let keys = match self.derive(&symbols) {
            Derivation::Keys(keys) => keys,
            Derivation::Invalid => {
                self.ctx.statistics.increment(Counters::Invalid);
                return false;
            }
            Derivation::Failed(error) => {
                self.ctx.statistics.increment(Counters::DerivationErrors);
                debug!(
                    combination = %current,
                    deriver = self.deriver.name(),
                    %error,
                    "derivation failed; combination skipped"
                );
                return false;
            }
        };

        self.ctx
            .statistics
            .add(Counters::KeysChecked, keys.len() as u64);
        let index = &self.ctx.inputs.index;
        let matched: Vec<MatchedKey> = keys
            .into_iter()
            .enumerate()
            .filter(|(_, key)| index.contains(fingerprint_of(key.as_bytes())))
            .map(|(position, key)| MatchedKey { position, key })
            .collect();

        if matched.is_empty() {
            return false;
        }
        self.record_hit(&symbols, matched);
        true
    }

    fn derive(&self, symbols: &[&str]) -> Derivation {
        let deriver = &self.deriver;
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            if !deriver.is_valid_combination(symbols) {
                return Ok(None);
            }
            deriver.derive_keys(symbols).map(Some)
        }));
        match attempt {
            Ok(Ok(Some(keys))) => Derivation::Keys(keys),
            Ok(Ok(None)) => Derivation::Invalid,
            Ok(Err(error)) => Derivation::Failed(error),
            Err(payload) => Derivation::Failed(DeriveError::Panicked(panic_message(&*payload))),
        }
    }

    fn record_hit(&mut self, symbols: &[&str], matched_keys: Vec<MatchedKey>) {
        let found = FoundRecord {
            combination: symbols.iter().map(|s| s.to_string()).collect(),
            matched_keys,
            tested_at_count: self.ctx.progress.total_tested,
        };
        self.ctx.statistics.increment(Counters::Hits);
        info!(
            combination = ?found.combination,
            keys = found.matched_keys.len(),
            tested_at = found.tested_at_count,
            "hit"
        );

        if let Err(error) = self.store.append_found(&found) {
            self.ctx.statistics.increment(Counters::CheckpointFailures);
            error!(%error, "could not append hit to found log; it is kept in the checkpoint");
        }
        self.ctx.progress.found.push(found);
    }

    /// Write a checkpoint from an immutable snapshot of progress.
    ///
    /// Failure is logged and counted; the sweep carries on in memory and the
    /// next periodic save retries.
    fn checkpoint(&mut self, exhausted: bool) {
        let progress = &self.ctx.progress;
        let record = CheckpointRecord {
            version: CHECKPOINT_VERSION,
            n: self.enumerator.n(),
            k: self.enumerator.k(),
            state: progress.last_tested.clone(),
            total_tested: progress.total_tested,
            found: progress.found.clone(),
            exhausted,
            saved_at: Utc::now(),
        };
        match self.store.save(&record) {
            Ok(()) => self.ctx.statistics.increment(Counters::CheckpointSaves),
            Err(error) => {
                self.ctx.statistics.increment(Counters::CheckpointFailures);
                warn!(%error, "checkpoint save failed; continuing with in-memory progress");
            }
        }
        self.last_checkpoint = Instant::now();
    }

    /// Returns `true` when the sweep should stop.
    fn yield_point(&mut self) -> bool {
        self.publish();
        if self.handle.take_cancel() {
            return true;
        }
        if self.handle.take_force_checkpoint()
            || self.last_checkpoint.elapsed() >= self.config.checkpoint_interval()
        {
            self.checkpoint(false);
        }
        false
    }

    fn finish(&mut self, outcome: Outcome, elapsed: Duration) -> RunSummary {
        let exhausted = outcome == Outcome::Exhausted;
        self.phase = if exhausted {
            DriverPhase::Exhausted
        } else {
            DriverPhase::Interrupted
        };
        self.checkpoint(exhausted);
        self.publish();

        let progress = &self.ctx.progress;
        let summary = RunSummary {
            outcome,
            total_tested: progress.total_tested,
            session_tested: progress.session_tested,
            found: progress.found.clone(),
            statistics: self.ctx.statistics.clone(),
            elapsed,
        };
        info!(
            outcome = ?summary.outcome,
            total_tested = summary.total_tested,
            session_tested = summary.session_tested,
            found = summary.found.len(),
            stats = %summary.statistics,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "sweep stopped"
        );
        summary
    }
}

/// Load the checkpoint into `progress`. Returns whether a position was restored.
fn restore(enumerator: &Enumerator, store: &CheckpointStore, progress: &mut Progress) -> bool {
    let Some(record) = store.load() else {
        return false;
    };
    if record.n != enumerator.n() || record.k != enumerator.k() {
        warn!(
            saved_n = record.n,
            saved_k = record.k,
            n = enumerator.n(),
            k = enumerator.k(),
            "checkpoint belongs to a different search space; starting fresh"
        );
        return false;
    }
    let Some(state) = record.state else {
        return false;
    };
    match enumerator.resume(state) {
        Ok(state) => {
            progress.next = enumerator.next(&state);
            progress.last_tested = Some(state);
            progress.total_tested = record.total_tested;
            progress.found = record.found;
            true
        }
        Err(error) => {
            warn!(%error, "checkpoint state rejected; starting fresh");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
