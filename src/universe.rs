// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The symbol universe: the n symbols combinations are drawn from.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::combination::CombinationState;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("I/O error reading universe {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("universe {path} contains no symbols")]
    Empty { path: PathBuf },
}

/// Ordered list of symbols; combination indices refer to positions in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    symbols: Vec<String>,
}

impl Universe {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    /// Read one symbol per line. Surrounding whitespace is trimmed and
    /// blank lines are skipped.
    pub fn from_path(path: &Path) -> Result<Self, UniverseError> {
        let text = std::fs::read_to_string(path).map_err(|error| UniverseError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let symbols: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if symbols.is_empty() {
            return Err(UniverseError::Empty {
                path: path.to_path_buf(),
            });
        }
        info!(path = %path.display(), symbols = symbols.len(), "loaded symbol universe");
        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }

    /// Map a combination to its symbols, in index order.
    ///
    /// The combination must come from an enumerator sized to this universe.
    pub fn select<'a>(&'a self, combination: &CombinationState) -> Vec<&'a str> {
        combination
            .indices()
            .iter()
            .map(|&i| self.symbols[i].as_str())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Universe {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
