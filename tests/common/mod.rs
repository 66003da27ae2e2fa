// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use comb_sweep::config::SearchConfig;
use comb_sweep::index::IndexWriter;
use comb_sweep::{Enumerator, KeyDeriver, SearchDriver};
use tempfile::TempDir;

/// Six symbols, so `k = 3` gives 20 combinations.
pub const SYMBOLS: [&str; 6] = ["abandon", "ability", "able", "about", "above", "absent"];

/// Keys that hit, with their lexicographic 1-based test counts for `k = 3`:
/// `{0,1,2}` is the 1st, `{1,3,5}` the 15th and `{3,4,5}` the 20th combination.
pub const HIT_KEYS: [&str; 3] = [
    "abandon ability able",
    "ability about absent",
    "aboutaboveabsent",
];

/// A universe file, an index file and room for checkpoints, in a temp dir.
pub struct Fixture {
    pub dir: TempDir,
    pub index_path: PathBuf,
    pub universe_path: PathBuf,
}

impl Fixture {
    pub fn new(index_keys: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let universe_path = dir.path().join("universe.txt");
        std::fs::write(&universe_path, SYMBOLS.join("\n")).unwrap();

        let index_path = dir.path().join("keys.idx");
        let mut writer = IndexWriter::new();
        writer.extend(index_keys.iter().copied());
        writer.write_path(&index_path).unwrap();

        Self {
            dir,
            index_path,
            universe_path,
        }
    }

    pub fn with_hits() -> Self {
        Self::new(&HIT_KEYS)
    }

    /// Checkpoint inside the fixture, yielding after every combination.
    pub fn config(&self, k: usize) -> SearchConfig {
        self.config_named(k, "sweep.checkpoint.json")
    }

    pub fn config_named(&self, k: usize, checkpoint: &str) -> SearchConfig {
        SearchConfig {
            k: Some(k),
            yield_every: 1,
            checkpoint_path: self.dir.path().join(checkpoint),
            ..SearchConfig::default()
        }
    }

    pub fn driver(&self, config: SearchConfig, deriver: Box<dyn KeyDeriver>) -> SearchDriver {
        SearchDriver::initialize(config, &self.index_path, &self.universe_path, deriver).unwrap()
    }
}

/// Every k-combination of [`SYMBOLS`], as symbol lists, in sweep order.
pub fn all_combinations(k: usize) -> Vec<Vec<String>> {
    let enumerator = Enumerator::new(SYMBOLS.len(), k).unwrap();
    let mut result = Vec::new();
    let mut state = enumerator.first();
    loop {
        result.push(
            state
                .indices()
                .iter()
                .map(|&i| SYMBOLS[i].to_string())
                .collect(),
        );
        if !enumerator.advance(&mut state) {
            break;
        }
    }
    result
}

pub fn words(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}
