// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Producing index files.
//!
//! Fingerprints are collected in any order; [`IndexWriter::finish`] sorts and
//! deduplicates them so the file always satisfies the format's ordering
//! requirement.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use super::{fingerprint_of, ENTRY_WIDTH, MAGIC};

#[derive(Debug, Default)]
pub struct IndexWriter {
    fingerprints: Vec<u64>,
}

impl IndexWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw key; it is fingerprinted on the way in.
    pub fn push_key(&mut self, key: &[u8]) {
        self.fingerprints.push(fingerprint_of(key));
    }

    pub fn push_fingerprint(&mut self, fingerprint: u64) {
        self.fingerprints.push(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Sort, deduplicate and hand back the payload that would be written.
    pub fn finish(mut self) -> Vec<u64> {
        self.fingerprints.sort_unstable();
        self.fingerprints.dedup();
        self.fingerprints
    }

    /// Write header and payload to `out`. Returns the number of entries.
    pub fn write_to<W: Write>(self, mut out: W) -> io::Result<u64> {
        let entries = self.finish();
        let count = entries.len() as u64;
        out.write_all(&MAGIC)?;
        out.write_all(&count.to_le_bytes())?;
        out.write_all(&ENTRY_WIDTH.to_le_bytes())?;
        for fingerprint in entries {
            out.write_all(&fingerprint.to_le_bytes())?;
        }
        out.flush()?;
        Ok(count)
    }

    pub fn write_path(self, path: &Path) -> io::Result<u64> {
        let mut out = BufWriter::new(File::create(path)?);
        let count = self.write_to(&mut out)?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        info!(path = %path.display(), entries = count, "wrote fingerprint index");
        Ok(count)
    }
}

impl<K: AsRef<[u8]>> Extend<K> for IndexWriter {
    fn extend<I: IntoIterator<Item = K>>(&mut self, keys: I) {
        for key in keys {
            self.push_key(key.as_ref());
        }
    }
}
