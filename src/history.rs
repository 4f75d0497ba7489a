//! Conversion history: a log of past conversions, most recent first.
//!
//! The pipeline never touches a global history file. Callers inject a
//! [`HistoryStore`] and the conversion appends one [`ConversionRecord`] to it
//! when it finishes. Two stores ship with the crate:
//!
//! * [`MemoryHistoryStore`]: a mutex-guarded `Vec`, for tests and
//!   embedding.
//! * [`JsonHistoryStore`]: a pretty-printed JSON array on disk, rewritten
//!   atomically (temp file + rename) on every append.

use crate::error::Pdf2TilesError;
use crate::output::TileRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Durable summary of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// UUID v4; also the name of the conversion's output directory.
    pub id: String,
    /// Name of the source document as supplied by the caller.
    pub original_filename: String,
    pub timestamp: DateTime<Utc>,
    /// Pages selected for tiling, which may be fewer than the document holds.
    pub page_count: usize,
    /// Tiles written.
    pub tile_count: usize,
    /// Tiles dropped as blank.
    pub blank_filtered: usize,
    /// Written tiles in page, row, column order.
    pub files: Vec<TileRecord>,
}

/// Append/list store for [`ConversionRecord`]s.
///
/// Implementations must be `Send + Sync`: the conversion appends from a
/// blocking worker thread.
pub trait HistoryStore: Send + Sync {
    /// Record a finished conversion.
    fn append(&self, record: ConversionRecord) -> Result<(), Pdf2TilesError>;

    /// All records, most recent first.
    fn list(&self) -> Result<Vec<ConversionRecord>, Pdf2TilesError>;

    /// Look up one record by id.
    fn get(&self, id: &str) -> Result<Option<ConversionRecord>, Pdf2TilesError> {
        Ok(self.list()?.into_iter().find(|r| r.id == id))
    }
}

/// Shared handle to a store, as held by callers that outlive one conversion.
pub type SharedHistoryStore = Arc<dyn HistoryStore>;

/// In-memory history.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<ConversionRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, record: ConversionRecord) -> Result<(), Pdf2TilesError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Pdf2TilesError::HistoryFailed("history lock poisoned".into()))?;
        records.insert(0, record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ConversionRecord>, Pdf2TilesError> {
        let records = self
            .records
            .lock()
            .map_err(|_| Pdf2TilesError::HistoryFailed("history lock poisoned".into()))?;
        Ok(records.clone())
    }
}

/// History persisted as a JSON array file.
///
/// A missing file reads as an empty history. Appends are serialised through
/// an in-process mutex; concurrent writers in other processes are not
/// coordinated.
#[derive(Debug)]
pub struct JsonHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<ConversionRecord>, Pdf2TilesError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Pdf2TilesError::HistoryFailed(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            Pdf2TilesError::HistoryFailed(format!("parse {}: {e}", self.path.display()))
        })
    }

    fn write(&self, records: &[ConversionRecord]) -> Result<(), Pdf2TilesError> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| Pdf2TilesError::HistoryFailed(format!("serialise: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Pdf2TilesError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Atomic write: write to temp, then rename
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| Pdf2TilesError::OutputWriteFailed {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| Pdf2TilesError::OutputWriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl HistoryStore for JsonHistoryStore {
    fn append(&self, record: ConversionRecord) -> Result<(), Pdf2TilesError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Pdf2TilesError::HistoryFailed("history lock poisoned".into()))?;
        let mut records = self.read()?;
        debug!("Appending conversion {} to {}", record.id, self.path.display());
        records.insert(0, record);
        self.write(&records)
    }

    fn list(&self) -> Result<Vec<ConversionRecord>, Pdf2TilesError> {
        self.read()
    }
}
