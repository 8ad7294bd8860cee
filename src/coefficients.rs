//! Coefficient table for the lookup AI.
//!
//! Maps a [`NeighborhoodKey`] to an integer weight. Play only reads the table;
//! training appends new keys and adjusts existing weights but never removes an
//! entry. Access goes through scoped handles: [`CoefficientStore::reader`]
//! holds a shared lock and [`CoefficientStore::writer`] an exclusive one, both
//! released when the handle is dropped.
//!
//! On disk the table is a JSON document of `[key, weight]` pairs sorted by
//! key, read and written wholesale.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::board::Player;
use crate::encoder::NeighborhoodKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("coefficient table I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("coefficient table is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct TableFile {
    version: u32,
    entries: Vec<(u32, i32)>,
}

const TABLE_VERSION: u32 = 1;

/// A move made during a learning game, credited once the winner is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub key: NeighborhoodKey,
    pub player: Player,
}

/// Shared key -> weight table.
#[derive(Debug, Default)]
pub struct CoefficientStore {
    table: RwLock<HashMap<NeighborhoodKey, i32>>,
}

/// Shared read access to the table.
pub struct CoefficientReader<'a> {
    table: RwLockReadGuard<'a, HashMap<NeighborhoodKey, i32>>,
}

/// Exclusive append/update access to the table.
pub struct CoefficientWriter<'a> {
    table: RwLockWriteGuard<'a, HashMap<NeighborhoodKey, i32>>,
}

impl CoefficientStore {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table saved with [`CoefficientStore::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let parsed: TableFile = serde_json::from_reader(BufReader::new(file))?;
        let table: HashMap<_, _> = parsed
            .entries
            .into_iter()
            .map(|(k, w)| (NeighborhoodKey(k), w))
            .collect();
        info!(path = %path.display(), entries = table.len(), "coefficient table loaded");
        Ok(Self {
            table: RwLock::new(table),
        })
    }

    /// Load the table at `path`, or start empty when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        match Self::load(path.as_ref()) {
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.as_ref().display(), "no coefficient table, starting empty");
                Ok(Self::new())
            }
            other => other,
        }
    }

    /// Write the whole table to `path`.
    ///
    /// The data goes to a sibling temporary file first and is renamed into
    /// place. A failed save leaves the previous table intact and removes the
    /// temporary file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let mut entries: Vec<(u32, i32)> = self
            .reader()
            .table
            .iter()
            .map(|(k, &w)| (k.0, w))
            .collect();
        entries.sort_unstable();
        let count = entries.len();

        let tmp = path.with_extension("tmp");
        let written = (|| -> Result<(), StoreError> {
            let mut out = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(
                &mut out,
                &TableFile {
                    version: TABLE_VERSION,
                    entries,
                },
            )?;
            out.flush()?;
            drop(out);
            std::fs::rename(&tmp, path)?;
            Ok(())
        })();
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        info!(path = %path.display(), entries = count, "coefficient table saved");
        Ok(())
    }

    /// Acquire shared read access; released when the reader drops.
    pub fn reader(&self) -> CoefficientReader<'_> {
        CoefficientReader {
            table: self.table.read(),
        }
    }

    /// Acquire exclusive write access; blocks until readers are gone.
    pub fn writer(&self) -> CoefficientWriter<'_> {
        CoefficientWriter {
            table: self.table.write(),
        }
    }

    /// Number of keys with a weight.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CoefficientReader<'_> {
    /// Weight for `key`; unknown keys weigh 0.
    #[inline]
    pub fn weight(&self, key: NeighborhoodKey) -> i32 {
        self.table.get(&key).copied().unwrap_or(0)
    }

    /// Whether `key` has been seen in training.
    pub fn contains(&self, key: NeighborhoodKey) -> bool {
        self.table.contains_key(&key)
    }
}

impl CoefficientWriter<'_> {
    /// Add `delta` to the weight of `key`, creating the entry if needed.
    pub fn reinforce(&mut self, key: NeighborhoodKey, delta: i32) {
        let w = self.table.entry(key).or_insert(0);
        *w = w.saturating_add(delta);
    }

    /// Credit a finished game: `+1` for each move by the winner, `-1` otherwise.
    ///
    /// Returns the number of samples applied.
    pub fn learn(&mut self, samples: &[Sample], winner: Player) -> usize {
        for sample in samples {
            let delta = if sample.player == winner { 1 } else { -1 };
            self.reinforce(sample.key, delta);
        }
        debug!(
            samples = samples.len(),
            entries = self.table.len(),
            %winner,
            "coefficients updated"
        );
        samples.len()
    }
}
