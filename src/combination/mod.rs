// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Lexicographic enumeration of k-subsets of `{0, ..., n-1}`.
//!
//! A combination is held as a strictly increasing index vector. The
//! [`Enumerator`] owns the shape of the search space (`n` and `k`) and
//! provides the successor function used by the driver's hot loop.
//!
//! # Example
//!
//! ```
//! use comb_sweep::combination::Enumerator;
//!
//! let enumerator = Enumerator::new(5, 3).unwrap();
//! let mut state = enumerator.first();
//! let mut count = 1;
//! while let Some(next) = enumerator.next(&state) {
//!     state = next;
//!     count += 1;
//! }
//! assert_eq!(count, 10);
//! assert_eq!(state.indices(), &[2, 3, 4]);
//! ```
//!
//! Both `next` and `resume` are pure: they never touch anything but their
//! arguments, so a saved state can be handed back to any enumerator with the
//! same shape and continue exactly where the previous one left off.

pub mod rank;

pub use rank::{binomial, SearchRange};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// One point in the lexicographic ordering of all k-subsets.
///
/// Invariant (checked by [`Enumerator::resume`]): `idx[0] < idx[1] < ... < idx[k-1]`
/// and `idx[i] <= n - k + i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombinationState(Vec<usize>);

impl CombinationState {
    /// Wrap raw indices without validation.
    ///
    /// Use [`Enumerator::resume`] to obtain a state that is known to be valid.
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_indices(self) -> Vec<usize> {
        self.0
    }
}

impl fmt::Display for CombinationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "}}")
    }
}

/// A saved state that cannot be a valid combination for this enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStateError {
    #[error("state has {actual} positions, expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("position {position} holds {value}, maximum allowed is {max}")]
    OutOfRange {
        position: usize,
        value: usize,
        max: usize,
    },

    #[error("position {position} ({value}) is not greater than its predecessor ({previous})")]
    NotIncreasing {
        position: usize,
        previous: usize,
        value: usize,
    },

    #[error("rank {rank} is outside the {total} combinations of this search space")]
    RankOutOfRange { rank: u128, total: u128 },
}

/// Successor function over the k-subsets of an n-element universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enumerator {
    n: usize,
    k: usize,
}

impl Enumerator {
    /// Create an enumerator for k-subsets of `{0, ..., n-1}`.
    ///
    /// `k > n` is rejected here, before any enumeration starts.
    pub fn new(n: usize, k: usize) -> Result<Self, ConfigError> {
        if k > n {
            return Err(ConfigError::KExceedsUniverse { k, n });
        }
        Ok(Self { n, k })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Largest value position `i` may ever hold.
    #[inline]
    fn max_at(&self, i: usize) -> usize {
        self.n - self.k + i
    }

    /// The lexicographically smallest combination, `[0, 1, ..., k-1]`.
    pub fn first(&self) -> CombinationState {
        CombinationState((0..self.k).collect())
    }

    /// The combination following `state`, or `None` once the space is exhausted.
    pub fn next(&self, state: &CombinationState) -> Option<CombinationState> {
        let mut next = state.clone();
        if self.advance(&mut next) {
            Some(next)
        } else {
            None
        }
    }

    /// In-place form of [`next`](Self::next).
    ///
    /// Returns `false` and leaves `state` untouched when no successor exists.
    pub fn advance(&self, state: &mut CombinationState) -> bool {
        let idx = &mut state.0;
        debug_assert_eq!(idx.len(), self.k);

        // Rightmost position that has not reached its ceiling.
        let Some(i) = (0..self.k).rev().find(|&i| idx[i] < self.max_at(i)) else {
            return false;
        };

        idx[i] += 1;
        for j in i + 1..self.k {
            idx[j] = idx[j - 1] + 1;
        }
        true
    }

    /// Validate a saved state so it can be fed back into [`next`](Self::next).
    ///
    /// The state is returned unchanged when it satisfies the invariant.
    pub fn resume(&self, saved: CombinationState) -> Result<CombinationState, InvalidStateError> {
        let idx = saved.indices();
        if idx.len() != self.k {
            return Err(InvalidStateError::WrongLength {
                expected: self.k,
                actual: idx.len(),
            });
        }
        for (position, &value) in idx.iter().enumerate() {
            let max = self.max_at(position);
            if value > max {
                return Err(InvalidStateError::OutOfRange {
                    position,
                    value,
                    max,
                });
            }
            if position > 0 && value <= idx[position - 1] {
                return Err(InvalidStateError::NotIncreasing {
                    position,
                    previous: idx[position - 1],
                    value,
                });
            }
        }
        Ok(saved)
    }

    /// `C(n, k)`, or `None` if it does not fit in a `u128`.
    ///
    /// Informational only; exhaustion is detected by [`advance`](Self::advance).
    pub fn total(&self) -> Option<u128> {
        binomial(self.n, self.k)
    }
}
