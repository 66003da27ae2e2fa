// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Resumable exhaustive sweep of k-combinations against a fingerprint index.
//!
//! Given a universe of `n` symbols and a size `k`, the sweep visits every
//! k-combination exactly once in lexicographic order, turns each into zero or
//! more keys, and checks each key's 64-bit fingerprint against a large sorted
//! index loaded into memory.
//!
//! # Architecture
//!
//! The implementation separates data by how it changes:
//!
//! ## Inputs (Immutable)
//!
//! Loaded once and shared via `Arc`:
//! - [`index::FingerprintIndex`] - sorted `u64` fingerprints, binary searched
//! - [`universe::Universe`] - the ordered symbol list
//!
//! ## Progress (Mutable, single writer)
//!
//! Owned by exactly one [`driver::SearchDriver`]:
//! - the last tested and next combination
//! - cumulative counters and every hit found
//!
//! Progress is saved by the [`checkpoint::CheckpointStore`], so a sweep can be
//! interrupted at any yield point and continued later without re-testing or
//! skipping a combination.
//!
//! # Search space
//!
//! [`combination::Enumerator`] generates the successor of any combination in
//! place. It can also rank and unrank combinations and split the space into
//! contiguous ranges, each of which can be given to its own driver.

pub mod checkpoint;
pub mod combination;
pub mod config;
pub mod context;
pub mod derive;
pub mod driver;
pub mod error;
pub mod index;
pub mod state;
pub mod universe;

// Re-export commonly used types
pub use combination::{CombinationState, Enumerator};
pub use config::SearchConfig;
pub use context::SearchContext;
pub use derive::{Key, KeyDeriver};
pub use driver::{DriverHandle, Outcome, RunSummary, SearchDriver};
pub use error::{Result, SweepError};
pub use index::FingerprintIndex;
