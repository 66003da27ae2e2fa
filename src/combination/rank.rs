// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Combinatorial number system: counting, ranking and unranking.
//!
//! None of this is needed to enumerate. It lets a caller jump straight to the
//! N-th combination, report how far a sweep has progressed, and cut the
//! lexicographic order into disjoint contiguous ranges.

use serde::{Deserialize, Serialize};

use super::{CombinationState, Enumerator, InvalidStateError};

/// Binomial coefficient C(n, k), or `None` on `u128` overflow.
///
/// Uses the recurrence C(n, i+1) = C(n, i) * (n - i) / (i + 1), starting
/// with C(n, 0) = 1. Every intermediate value is itself a binomial
/// coefficient, so the division is always exact.
pub fn binomial(n: usize, k: usize) -> Option<u128> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut c: u128 = 1;
    for i in 0..k {
        c = c.checked_mul((n - i) as u128)? / (i + 1) as u128;
    }
    Some(c)
}

/// A contiguous slice `[start, stop)` of the lexicographic order.
///
/// `stop == None` means "until the enumerator is exhausted".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRange {
    pub start: CombinationState,
    pub stop: Option<CombinationState>,
}

impl SearchRange {
    /// Whether `state` lies before the exclusive upper bound.
    pub fn admits(&self, state: &CombinationState) -> bool {
        match &self.stop {
            Some(stop) => state < stop,
            None => true,
        }
    }
}

impl Enumerator {
    /// Zero-based position of `state` in the lexicographic order.
    ///
    /// `state` is assumed valid (see [`Enumerator::resume`]).
    pub fn rank(&self, state: &CombinationState) -> Option<u128> {
        let (n, k) = (self.n(), self.k());
        let mut rank: u128 = 0;
        let mut low = 0;
        for (i, &value) in state.indices().iter().enumerate() {
            // Every combination sharing the prefix but holding a smaller
            // value at position i comes first.
            for v in low..value {
                rank = rank.checked_add(binomial(n - 1 - v, k - 1 - i)?)?;
            }
            low = value + 1;
        }
        Some(rank)
    }

    /// The combination at position `rank`, computed directly.
    pub fn unrank(&self, rank: u128) -> Result<CombinationState, InvalidStateError> {
        let (n, k) = (self.n(), self.k());
        let total = self.total().unwrap_or(u128::MAX);
        if rank >= total {
            return Err(InvalidStateError::RankOutOfRange { rank, total });
        }

        let mut remaining = rank;
        let mut indices = Vec::with_capacity(k);
        let mut value = 0;
        for i in 0..k {
            loop {
                let block = binomial(n - 1 - value, k - 1 - i).unwrap_or(u128::MAX);
                if remaining < block {
                    break;
                }
                remaining -= block;
                value += 1;
            }
            indices.push(value);
            value += 1;
        }
        Ok(CombinationState::from_indices(indices))
    }

    /// Split the whole search space into at most `parts` disjoint ranges of
    /// near-equal size, in lexicographic order.
    ///
    /// Returns `None` if `C(n, k)` overflows `u128`.
    pub fn partition(&self, parts: usize) -> Option<Vec<SearchRange>> {
        let total = self.total()?;
        if parts == 0 || total == 0 {
            return Some(Vec::new());
        }
        let size = total.div_ceil(parts as u128);

        let mut starts = Vec::with_capacity(parts);
        let mut rank = 0;
        while rank < total {
            starts.push(self.unrank(rank).ok()?);
            rank += size;
        }

        let mut ranges = Vec::with_capacity(starts.len());
        let mut iter = starts.into_iter().peekable();
        while let Some(start) = iter.next() {
            let stop = iter.peek().cloned();
            ranges.push(SearchRange { start, stop });
        }
        Some(ranges)
    }
}
