// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Key fingerprints.
//!
//! A fingerprint is XXH64 of the raw key bytes under a fixed seed. XXH64 has
//! a published, fixed mixing schedule, so index files produced by any other
//! XXH64 implementation with the same seed are interchangeable with ours.

use xxhash_rust::xxh64::xxh64;

/// Seed shared by every producer and consumer of index files.
pub const FINGERPRINT_SEED: u64 = 0x5EED_C0B1_7A5E_F00D;

/// Map an arbitrary-length key to its 64-bit fingerprint.
#[inline]
pub fn fingerprint_of(key: &[u8]) -> u64 {
    xxh64(key, FINGERPRINT_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_pinned() {
        // Values any external index generator must reproduce.
        assert_eq!(fingerprint_of(b""), 0x56dd_99d7_002e_220e);
        assert_eq!(fingerprint_of(b"abandon ability able"), 0xcb28_de46_5a03_e041);
        assert_eq!(
            fingerprint_of(b"a quick brown fox jumps over the lazy dog"),
            0xdf81_e7b0_ba85_1681
        );
    }

    #[test]
    fn test_fingerprint_depends_on_every_byte() {
        assert_ne!(fingerprint_of(b"abandon ability"), fingerprint_of(b"abandon abilitz"));
        assert_ne!(fingerprint_of(b"ab"), fingerprint_of(b"ba"));
    }
}
