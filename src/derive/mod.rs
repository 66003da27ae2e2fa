// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Key derivation collaborator.
//!
//! The sweep does not know how a combination of symbols becomes lookup keys.
//! It asks a [`KeyDeriver`]: first whether the combination is acceptable at
//! all, then for the ordered list of keys to fingerprint and look up.
//!
//! # Example
//!
//! ```
//! use comb_sweep::derive::{Key, KeyDeriver, DeriveError};
//!
//! #[derive(Debug)]
//! struct Upper;
//!
//! impl KeyDeriver for Upper {
//!     fn is_valid_combination(&self, symbols: &[&str]) -> bool {
//!         !symbols.is_empty()
//!     }
//!
//!     fn derive_keys(&self, symbols: &[&str]) -> Result<Vec<Key>, DeriveError> {
//!         Ok(vec![Key::from(symbols.join("-").to_uppercase())])
//!     }
//! }
//!
//! let keys = Upper.derive_keys(&["a", "b"]).unwrap();
//! assert_eq!(keys[0].as_bytes(), b"A-B");
//! ```


use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::driver::DriverHandle;

/// An opaque byte string produced by derivation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", hex::encode(&self.0))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

// Keys are stored as hex strings in checkpoints and the found log.
impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(Key).map_err(serde::de::Error::custom)
    }
}

/// Failure to derive keys for one combination.
///
/// Never fatal to a sweep: the combination is counted as an error and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    #[error("key derivation failed: {0}")]
    Failed(String),

    #[error("key derivation panicked: {0}")]
    Panicked(String),
}

/// Turns an ordered combination of symbols into lookup keys.
///
/// Implementations are treated as synchronous and side-effect free.
pub trait KeyDeriver: Debug {
    /// Cheap pre-check; combinations rejected here are never derived.
    fn is_valid_combination(&self, symbols: &[&str]) -> bool;

    /// Ordered, possibly empty, list of keys for `symbols`.
    fn derive_keys(&self, symbols: &[&str]) -> Result<Vec<Key>, DeriveError>;

    /// Name used in log messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T: KeyDeriver + ?Sized> KeyDeriver for Box<T> {
    fn is_valid_combination(&self, symbols: &[&str]) -> bool {
        (**self).is_valid_combination(symbols)
    }

    fn derive_keys(&self, symbols: &[&str]) -> Result<Vec<Key>, DeriveError> {
        (**self).derive_keys(symbols)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Plain-text phrase keys.
///
/// Rejects combinations containing a blank symbol. Derives two keys: the
/// symbols joined by single spaces, then the symbols concatenated.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhraseDeriver;

impl KeyDeriver for PhraseDeriver {
    fn is_valid_combination(&self, symbols: &[&str]) -> bool {
        symbols.iter().all(|s| !s.trim().is_empty())
    }

    fn derive_keys(&self, symbols: &[&str]) -> Result<Vec<Key>, DeriveError> {
        Ok(vec![
            Key::from(symbols.join(" ")),
            Key::from(symbols.concat()),
        ])
    }

    fn name(&self) -> &str {
        "Phrase"
    }
}

/// Wraps a deriver and requests cancellation of the sweep once `limit`
/// combinations have been derived.
///
/// The request is observed at the driver's next yield point.
#[derive(Debug)]
pub struct CancelAfter<D> {
    inner: D,
    handle: DriverHandle,
    limit: u64,
    derived: AtomicU64,
}

impl<D: KeyDeriver> CancelAfter<D> {
    pub fn new(inner: D, handle: DriverHandle, limit: u64) -> Self {
        Self {
            inner,
            handle,
            limit,
            derived: AtomicU64::new(0),
        }
    }
}

impl<D: KeyDeriver> KeyDeriver for CancelAfter<D> {
    fn is_valid_combination(&self, symbols: &[&str]) -> bool {
        self.inner.is_valid_combination(symbols)
    }

    fn derive_keys(&self, symbols: &[&str]) -> Result<Vec<Key>, DeriveError> {
        let derived = self.derived.fetch_add(1, Ordering::Relaxed) + 1;
        if derived >= self.limit {
            self.handle.cancel();
        }
        self.inner.derive_keys(symbols)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
