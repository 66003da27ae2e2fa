// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Integration tests for the sweep driver.
//!
//! These tests validate that the driver correctly:
//! - Tests every combination once and records each hit
//! - Writes hits to the found log as they happen
//! - Falls back to a fresh start on unusable checkpoints
//! - Survives checkpoint write failures
//! - Confines itself to a range when partitioned
//! - Fails fatally only when its inputs cannot be loaded

mod common;

use std::collections::BTreeSet;

use chrono::Utc;
use comb_sweep::checkpoint::{CheckpointRecord, CheckpointStore, CHECKPOINT_VERSION};
use comb_sweep::derive::test::RecordingDeriver;
use comb_sweep::derive::PhraseDeriver;
use comb_sweep::driver::DriverPhase;
use comb_sweep::state::Counters;
use comb_sweep::{CombinationState, Enumerator, Outcome, SearchDriver, SweepError};

use common::{all_combinations, words, Fixture, HIT_KEYS};

#[test]
fn test_full_sweep_finds_every_hit() {
    let fixture = Fixture::with_hits();
    let config = fixture.config(3);
    let found_log = config.found_log_path();
    let mut driver = fixture.driver(config, Box::new(PhraseDeriver));
    assert!(!driver.restored());

    let summary = driver.run();
    assert_eq!(summary.outcome, Outcome::Exhausted);
    assert_eq!(summary.total_tested, 20);
    assert_eq!(summary.session_tested, 20);
    assert_eq!(summary.statistics.get(Counters::Hits), 3);
    assert_eq!(summary.statistics.get(Counters::KeysChecked), 40);
    assert_eq!(summary.statistics.misses(), 17);

    let found: Vec<_> = summary
        .found
        .iter()
        .map(|f| (f.combination.clone(), f.matched_keys[0].position, f.tested_at_count))
        .collect();
    assert_eq!(
        found,
        vec![
            (words(&["abandon", "ability", "able"]), 0, 1),
            (words(&["ability", "about", "absent"]), 0, 15),
            (words(&["about", "above", "absent"]), 1, 20),
        ]
    );
    assert_eq!(
        summary.found[1].matched_keys[0].key.as_bytes(),
        HIT_KEYS[1].as_bytes()
    );

    let store = CheckpointStore::new(fixture.dir.path().join("sweep.checkpoint.json"), found_log);
    assert_eq!(store.read_found_log(), summary.found);
    let record = store.load().unwrap();
    assert!(record.exhausted);
    assert_eq!(record.total_tested, 20);
    assert_eq!(record.found, summary.found);
}

#[test]
fn test_every_combination_derived_once_in_order() {
    let fixture = Fixture::with_hits();
    let recorder = RecordingDeriver::new();
    let mut driver = fixture.driver(fixture.config(2), Box::new(recorder.clone()));
    driver.run();
    assert_eq!(recorder.seen(), all_combinations(2));
}

#[test]
fn test_corrupt_checkpoint_starts_fresh() {
    let fixture = Fixture::with_hits();
    let config = fixture.config(3);
    std::fs::write(&config.checkpoint_path, b"\x00\x01 definitely not json").unwrap();

    let mut driver = fixture.driver(config, Box::new(PhraseDeriver));
    assert!(!driver.restored());
    let summary = driver.run();
    assert_eq!(summary.total_tested, 20);
    assert_eq!(summary.found.len(), 3);
}

#[test]
fn test_checkpoint_for_other_k_starts_fresh() {
    let fixture = Fixture::with_hits();
    let mut driver = fixture.driver(fixture.config(2), Box::new(PhraseDeriver));
    assert_eq!(driver.run().total_tested, 15);

    let mut driver = fixture.driver(fixture.config(3), Box::new(PhraseDeriver));
    assert!(!driver.restored());
    assert_eq!(driver.run().total_tested, 20);
}

#[test]
fn test_checkpoint_with_invalid_state_starts_fresh() {
    let fixture = Fixture::with_hits();
    let config = fixture.config(3);
    let store = CheckpointStore::new(config.checkpoint_path.clone(), config.found_log_path());
    store
        .save(&CheckpointRecord {
            version: CHECKPOINT_VERSION,
            n: 6,
            k: 3,
            state: Some(CombinationState::from_indices(vec![0, 4, 9])),
            total_tested: 12,
            found: Vec::new(),
            exhausted: false,
            saved_at: Utc::now(),
        })
        .unwrap();

    let mut driver = fixture.driver(config, Box::new(PhraseDeriver));
    assert!(!driver.restored());
    assert_eq!(driver.progress().total_tested, 0);
    assert_eq!(driver.run().total_tested, 20);
}

#[test]
fn test_checkpoint_interval_zero_saves_at_every_yield() {
    let fixture = Fixture::new(&[]);
    let mut config = fixture.config(3);
    config.checkpoint_interval_secs = 0;

    let mut driver = fixture.driver(config, Box::new(PhraseDeriver));
    let summary = driver.run();
    // One yield point before each of the 20 steps, one that finds the end,
    // and the final save.
    assert_eq!(summary.statistics.get(Counters::CheckpointSaves), 22);
    assert_eq!(summary.statistics.get(Counters::CheckpointFailures), 0);
}

#[test]
fn test_forced_checkpoint() {
    let fixture = Fixture::new(&[]);
    let mut driver = fixture.driver(fixture.config(3), Box::new(PhraseDeriver));
    driver.handle().force_checkpoint();

    let summary = driver.run();
    // The forced save and the final save; the interval never elapses.
    assert_eq!(summary.statistics.get(Counters::CheckpointSaves), 2);
}

#[test]
fn test_checkpoint_failures_are_not_fatal() {
    let fixture = Fixture::with_hits();
    let mut config = fixture.config(3);
    config.checkpoint_path = fixture.dir.path().join("missing").join("sweep.json");

    let mut driver = fixture.driver(config, Box::new(PhraseDeriver));
    let summary = driver.run();
    assert_eq!(summary.outcome, Outcome::Exhausted);
    assert_eq!(summary.total_tested, 20);
    assert_eq!(summary.found.len(), 3);
    assert_eq!(summary.statistics.get(Counters::CheckpointSaves), 0);
    // Three found log appends, three post-hit saves and the final save.
    assert_eq!(summary.statistics.get(Counters::CheckpointFailures), 7);
}

#[test]
fn test_partitioned_ranges_cover_space_once() {
    let fixture = Fixture::with_hits();
    let ranges = Enumerator::new(6, 3).unwrap().partition(3).unwrap();
    assert_eq!(ranges.len(), 3);

    let recorder = RecordingDeriver::new();
    let mut total = 0;
    let mut found = Vec::new();
    for (part, range) in ranges.into_iter().enumerate() {
        let config = fixture.config_named(3, &format!("part-{part}.json"));
        let mut driver = fixture
            .driver(config, Box::new(recorder.clone()))
            .with_range(range)
            .unwrap();
        let summary = driver.run();
        assert_eq!(summary.outcome, Outcome::Exhausted);
        total += summary.total_tested;
        found.extend(summary.found.into_iter().map(|f| f.combination));
    }

    assert_eq!(total, 20);
    assert_eq!(recorder.seen(), all_combinations(3));
    assert_eq!(found.len(), 3);
}

#[test]
fn test_range_start_must_be_valid() {
    let fixture = Fixture::with_hits();
    let mut range = Enumerator::new(6, 3).unwrap().partition(2).unwrap().remove(1);
    range.start = CombinationState::from_indices(vec![2, 2, 3]);

    let result = fixture
        .driver(fixture.config(3), Box::new(PhraseDeriver))
        .with_range(range);
    assert!(matches!(result, Err(SweepError::InvalidRange(_))));
}

#[test]
fn test_missing_index_is_fatal() {
    let fixture = Fixture::with_hits();
    let result = SearchDriver::initialize(
        fixture.config(3),
        &fixture.dir.path().join("nope.idx"),
        &fixture.universe_path,
        Box::new(PhraseDeriver),
    );
    assert!(matches!(result, Err(SweepError::Index(_))));
}

#[test]
fn test_truncated_index_is_fatal() {
    let fixture = Fixture::with_hits();
    let bytes = std::fs::read(&fixture.index_path).unwrap();
    std::fs::write(&fixture.index_path, &bytes[..bytes.len() - 3]).unwrap();

    let result = SearchDriver::initialize(
        fixture.config(3),
        &fixture.index_path,
        &fixture.universe_path,
        Box::new(PhraseDeriver),
    );
    assert!(matches!(result, Err(SweepError::Index(_))));
}

#[test]
fn test_empty_universe_is_fatal() {
    let fixture = Fixture::with_hits();
    std::fs::write(&fixture.universe_path, "\n  \n").unwrap();
    let result = SearchDriver::initialize(
        fixture.config(1),
        &fixture.index_path,
        &fixture.universe_path,
        Box::new(PhraseDeriver),
    );
    assert!(matches!(result, Err(SweepError::Universe(_))));
}

#[test]
fn test_handle_reports_progress_from_another_thread() {
    let fixture = Fixture::with_hits();
    let mut driver = fixture.driver(fixture.config(3), Box::new(PhraseDeriver));
    let handle = driver.handle();

    let observer = std::thread::spawn(move || {
        let snapshot = handle.snapshot();
        assert!(snapshot.total_tested <= 20);
        snapshot.total_combinations
    });
    let summary = driver.run();
    assert_eq!(observer.join().unwrap(), Some(20));

    let snapshot = driver.handle().snapshot();
    assert_eq!(snapshot.phase, DriverPhase::Exhausted);
    assert_eq!(snapshot.total_tested, summary.total_tested);
    assert_eq!(snapshot.found_count, 3);

    let distinct: BTreeSet<_> = summary.found.iter().map(|f| f.tested_at_count).collect();
    assert_eq!(distinct.len(), 3);
}
