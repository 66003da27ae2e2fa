// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Statistics
//!
//! Session counters kept by the driver. Errors are counted separately from
//! hits and misses so a suppressed derivation failure is never mistaken for
//! an ordinary non-matching combination.

use std::fmt;

use strum::EnumCount;
use strum_macros::{EnumCount as EnumCountMacro, EnumIter, IntoStaticStr};

#[derive(Debug, EnumCountMacro, EnumIter, IntoStaticStr, Copy, Clone, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Counters {
    /// Combinations visited, whatever their outcome.
    Tested,
    /// Combinations rejected by the deriver's validity check.
    Invalid,
    /// Combinations whose derivation failed or panicked.
    DerivationErrors,
    /// Combinations with at least one key in the index.
    Hits,
    /// Derived keys looked up in the index.
    KeysChecked,
    CheckpointSaves,
    CheckpointFailures,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Statistics {
    stats: [u64; Counters::COUNT],
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Increment the specified counter by 1.
    #[inline]
    pub fn increment(&mut self, counter: Counters) {
        self.stats[counter as usize] += 1;
    }

    #[inline]
    pub fn add(&mut self, counter: Counters, amount: u64) {
        self.stats[counter as usize] += amount;
    }

    /// Get the current value of the specified counter.
    pub fn get(&self, counter: Counters) -> u64 {
        self.stats[counter as usize]
    }

    /// Tested combinations that were neither hits, invalid, nor errors.
    pub fn misses(&self) -> u64 {
        self.get(Counters::Tested)
            - self.get(Counters::Hits)
            - self.get(Counters::Invalid)
            - self.get(Counters::DerivationErrors)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use strum::IntoEnumIterator;
        for (i, counter) in Counters::iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            let name: &'static str = counter.into();
            write!(f, "{}={}", name, self.get(counter))?;
        }
        Ok(())
    }
}
