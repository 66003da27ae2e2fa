// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Read-only sorted set of 64-bit fingerprints.
//!
//! # File format
//!
//! ```text
//! offset  size  contents
//!      0     8  magic tag, ASCII "CSWPIDX1"
//!      8     8  element count C, little-endian u64
//!     16     8  element width in bytes, little-endian u64 (must be 8)
//!     24    8C  C little-endian u64 fingerprints, ascending, no duplicates
//! ```
//!
//! The whole payload is loaded into one contiguous `Vec<u64>`; membership
//! queries are a binary search with no allocation.
//!
//! # Verification
//!
//! Binary search trusts the file to be sorted. At load time a configurable
//! prefix (or, with [`VerifyDepth::Full`], every entry) is checked. A
//! violation is surfaced as an [`OrderingWarning`], never as an error: an
//! unsorted index loads, but may answer queries wrongly.

pub mod fingerprint;
pub mod writer;

pub use fingerprint::{fingerprint_of, FINGERPRINT_SEED};
pub use writer::IndexWriter;

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::VerifyDepth;

/// Magic tag at the start of every index file.
pub const MAGIC: [u8; 8] = *b"CSWPIDX1";

/// Header length in bytes.
pub const HEADER_LEN: u64 = 24;

/// The only supported element width, in bytes.
pub const ENTRY_WIDTH: u64 = 8;

/// Entries decoded per read while loading.
const CHUNK_ENTRIES: usize = 8192;

/// Fatal errors while loading an index. No partial index is ever returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("bad magic: expected {:?}, found {:?}", String::from_utf8_lossy(.expected), String::from_utf8_lossy(.found))]
    BadMagic { expected: [u8; 8], found: [u8; 8] },

    #[error("index truncated: need {expected_bytes} bytes, only {available_bytes} present")]
    Truncated {
        expected_bytes: u64,
        available_bytes: u64,
    },

    #[error("unsupported element width {width} (only 8-byte entries are supported)")]
    UnsupportedWidth { width: u64 },

    #[error("I/O error reading index: {0}")]
    Io(#[from] io::Error),
}

/// The loaded fingerprints are not in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingWarning {
    /// Index of the first entry smaller than its predecessor.
    pub position: usize,
    pub previous: u64,
    pub value: u64,
}

impl fmt::Display for OrderingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index not sorted at entry {}: {:#018x} follows {:#018x}",
            self.position, self.value, self.previous
        )
    }
}

/// Outcome of the load-time sortedness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub depth: VerifyDepth,
    /// Number of leading entries actually inspected.
    pub checked: usize,
    pub warning: Option<OrderingWarning>,
    /// Equal neighbours among the inspected entries. Tolerated.
    pub duplicates: usize,
}

impl Verification {
    /// Whether query answers can be trusted without reservation.
    pub fn is_complete_and_clean(&self) -> bool {
        self.depth == VerifyDepth::Full && self.warning.is_none()
    }
}

/// Immutable sorted set of fingerprints.
#[derive(Debug, Clone)]
pub struct FingerprintIndex {
    entries: Vec<u64>,
    verification: Verification,
}

impl FingerprintIndex {
    /// Load an index file from disk.
    pub fn load_path(path: &Path, depth: VerifyDepth) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        let available = file.metadata()?.len();
        let index = Self::load_inner(BufReader::new(file), depth, Some(available))?;
        info!(
            path = %path.display(),
            entries = index.len(),
            checked = index.verification.checked,
            "loaded fingerprint index"
        );
        Ok(index)
    }

    /// Load an index from any byte source.
    pub fn load<R: Read>(reader: R, depth: VerifyDepth) -> Result<Self, LoadError> {
        Self::load_inner(reader, depth, None)
    }

    fn load_inner<R: Read>(
        mut reader: R,
        depth: VerifyDepth,
        available: Option<u64>,
    ) -> Result<Self, LoadError> {
        let mut header = [0u8; HEADER_LEN as usize];
        let got = read_full(&mut reader, &mut header)?;
        if got < header.len() {
            return Err(LoadError::Truncated {
                expected_bytes: HEADER_LEN,
                available_bytes: got as u64,
            });
        }

        let mut found = [0u8; 8];
        found.copy_from_slice(&header[0..8]);
        if found != MAGIC {
            return Err(LoadError::BadMagic {
                expected: MAGIC,
                found,
            });
        }
        let count = le_u64(&header[8..16]);
        let width = le_u64(&header[16..24]);
        if width != ENTRY_WIDTH {
            return Err(LoadError::UnsupportedWidth { width });
        }

        let expected_bytes = count
            .checked_mul(ENTRY_WIDTH)
            .and_then(|payload| payload.checked_add(HEADER_LEN))
            .unwrap_or(u64::MAX);
        // Reject an impossible count before allocating for it.
        if let Some(available) = available {
            if available < expected_bytes {
                return Err(LoadError::Truncated {
                    expected_bytes,
                    available_bytes: available,
                });
            }
        }

        let entries = read_entries(&mut reader, count, expected_bytes)?;

        let mut trailing = [0u8; 1];
        if read_full(&mut reader, &mut trailing)? > 0 {
            debug!(count, "index file has bytes after the declared entries; ignored");
        }

        Ok(Self::from_entries(entries, depth))
    }

    /// Build an index from fingerprints already in memory.
    ///
    /// The same sortedness check as a file load is applied.
    pub fn from_entries(entries: Vec<u64>, depth: VerifyDepth) -> Self {
        let verification = verify(&entries, depth);
        if let Some(warning) = &verification.warning {
            warn!(%warning, depth = %depth, "fingerprint index failed sortedness check; lookups may be wrong");
        }
        if verification.duplicates > 0 {
            info!(
                duplicates = verification.duplicates,
                "fingerprint index contains duplicate entries"
            );
        }
        Self {
            entries,
            verification,
        }
    }

    /// Whether `fingerprint` is present. O(log n), no allocation.
    #[inline]
    pub fn contains(&self, fingerprint: u64) -> bool {
        self.entries.binary_search(&fingerprint).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    pub fn ordering_warning(&self) -> Option<&OrderingWarning> {
        self.verification.warning.as_ref()
    }
}

#[inline]
fn le_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

/// Read until `buf` is full or the source is exhausted.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_entries<R: Read>(
    reader: &mut R,
    count: u64,
    expected_bytes: u64,
) -> Result<Vec<u64>, LoadError> {
    let count = usize::try_from(count).map_err(|_| LoadError::Truncated {
        expected_bytes,
        available_bytes: HEADER_LEN,
    })?;
    // Capacity is capped so a lying header cannot force a huge allocation
    // from a stream whose length is unknown.
    let mut entries = Vec::with_capacity(count.min(1 << 20));
    let mut buf = vec![0u8; CHUNK_ENTRIES * ENTRY_WIDTH as usize];

    while entries.len() < count {
        let want = (count - entries.len()).min(CHUNK_ENTRIES) * ENTRY_WIDTH as usize;
        let got = read_full(reader, &mut buf[..want])?;
        entries.extend(
            buf[..got - got % ENTRY_WIDTH as usize]
                .chunks_exact(ENTRY_WIDTH as usize)
                .map(le_u64),
        );
        if got < want {
            let read_payload = (entries.len() as u64) * ENTRY_WIDTH + (got as u64 % ENTRY_WIDTH);
            return Err(LoadError::Truncated {
                expected_bytes,
                available_bytes: HEADER_LEN + read_payload,
            });
        }
    }
    Ok(entries)
}

fn verify(entries: &[u64], depth: VerifyDepth) -> Verification {
    let checked = match depth {
        VerifyDepth::Sample(n) => n.min(entries.len()),
        VerifyDepth::Full => entries.len(),
    };

    let mut warning = None;
    let mut duplicates = 0;
    for (i, pair) in entries[..checked].windows(2).enumerate() {
        if pair[1] == pair[0] {
            duplicates += 1;
        } else if pair[1] < pair[0] && warning.is_none() {
            warning = Some(OrderingWarning {
                position: i + 1,
                previous: pair[0],
                value: pair[1],
            });
        }
    }

    Verification {
        depth,
        checked,
        warning,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(magic: &[u8; 8], count: u64, width: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(magic);
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes
    }

    fn file_bytes(values: &[u64]) -> Vec<u8> {
        let mut bytes = header(&MAGIC, values.len() as u64, ENTRY_WIDTH);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_contains_boundaries() {
        let index =
            FingerprintIndex::load(&file_bytes(&[10, 20, 30, 40])[..], VerifyDepth::Full).unwrap();
        assert_eq!(index.len(), 4);
        assert!(index.contains(10));
        assert!(index.contains(40));
        assert!(!index.contains(5));
        assert!(!index.contains(25));
        assert!(!index.contains(45));
        assert!(index.verification().is_complete_and_clean());
    }

    #[test]
    fn test_empty_index() {
        let index = FingerprintIndex::load(&file_bytes(&[])[..], VerifyDepth::default()).unwrap();
        assert!(index.is_empty());
        assert!(!index.contains(0));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = file_bytes(&[1, 2]);
        bytes[0..8].copy_from_slice(b"NOTANIDX");
        match FingerprintIndex::load(&bytes[..], VerifyDepth::default()) {
            Err(LoadError::BadMagic { expected, found }) => {
                assert_eq!(expected, MAGIC);
                assert_eq!(&found, b"NOTANIDX");
            }
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn test_short_header_is_truncated() {
        match FingerprintIndex::load(&MAGIC[..], VerifyDepth::default()) {
            Err(LoadError::Truncated {
                expected_bytes,
                available_bytes,
            }) => {
                assert_eq!(expected_bytes, 24);
                assert_eq!(available_bytes, 8);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_count_exceeds_payload() {
        let mut bytes = header(&MAGIC, 3, ENTRY_WIDTH);
        bytes.extend_from_slice(&7u64.to_le_bytes());
        bytes.extend_from_slice(&[0xAA; 3]);
        match FingerprintIndex::load(&bytes[..], VerifyDepth::default()) {
            Err(LoadError::Truncated {
                expected_bytes,
                available_bytes,
            }) => {
                assert_eq!(expected_bytes, 24 + 24);
                assert_eq!(available_bytes, 24 + 8 + 3);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_width() {
        let bytes = header(&MAGIC, 0, 4);
        assert!(matches!(
            FingerprintIndex::load(&bytes[..], VerifyDepth::default()),
            Err(LoadError::UnsupportedWidth { width: 4 })
        ));
    }

    #[test]
    fn test_huge_count_does_not_allocate() {
        let bytes = header(&MAGIC, u64::MAX / 16, ENTRY_WIDTH);
        assert!(matches!(
            FingerprintIndex::load(&bytes[..], VerifyDepth::default()),
            Err(LoadError::Truncated { .. })
        ));
    }

    #[test]
    fn test_sample_misses_late_disorder() {
        let mut values: Vec<u64> = (0..100).collect();
        values.swap(60, 61);

        let sampled = FingerprintIndex::from_entries(values.clone(), VerifyDepth::Sample(50));
        assert_eq!(sampled.verification().checked, 50);
        assert!(sampled.ordering_warning().is_none());

        let full = FingerprintIndex::from_entries(values, VerifyDepth::Full);
        assert_eq!(
            full.ordering_warning(),
            Some(&OrderingWarning {
                position: 61,
                previous: 61,
                value: 60
            })
        );
        assert!(!full.verification().is_complete_and_clean());
    }

    #[test]
    fn test_duplicates_tolerated_and_counted() {
        let index = FingerprintIndex::from_entries(vec![1, 2, 2, 3, 3, 3], VerifyDepth::Full);
        assert_eq!(index.verification().duplicates, 3);
        assert!(index.ordering_warning().is_none());
        assert!(index.contains(2));
        assert!(index.contains(3));
        assert!(!index.contains(4));
    }
}
