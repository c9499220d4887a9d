//! Record store for share metadata.
//!
//! The store keeps the whole collection in memory and writes the full
//! collection to a single JSON document after every mutation:
//!
//! ```text
//! {
//!   "sharedFiles": [
//!     { "id": "...", "name": "report.pdf", ... }
//!   ]
//! }
//! ```
//!
//! There is no partial-update API. Callers read the full list, modify it and
//! hand the result to [`RecordStore::upsert_all`], holding their own lock
//! around the whole sequence.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::record::ShareRecord;
use crate::{FastlaneError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(rename = "sharedFiles", default)]
    shared_files: Vec<ShareRecord>,
}

/// Durable ordered collection of [`ShareRecord`]s.
#[derive(Debug)]
pub struct RecordStore {
    /// Backing file, `None` for an in-memory store.
    path: Option<PathBuf>,
    records: RwLock<Vec<ShareRecord>>,
}

impl RecordStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => {
                let doc: StoreDocument = serde_json::from_slice(&bytes).map_err(|e| {
                    FastlaneError::Store(format!("{}: {e}", path.display()))
                })?;
                doc.shared_files
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        check_unique(&records)?;
        tracing::debug!(
            path = %path.display(),
            count = records.len(),
            "Record store opened"
        );

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// Create a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Backing file of this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All records in insertion order.
    pub fn list(&self) -> Vec<ShareRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Find a record by id.
    pub fn get(&self, id: &str) -> Option<ShareRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole collection.
    ///
    /// The document is written to a temporary file next to the store and
    /// renamed over it. The in-memory collection only changes after the
    /// write succeeded, so a failed write leaves the previous state intact.
    pub async fn upsert_all(&self, records: Vec<ShareRecord>) -> Result<()> {
        check_unique(&records)?;

        if let Some(path) = self.path.clone() {
            let doc = StoreDocument {
                shared_files: records,
            };
            let bytes = serde_json::to_vec_pretty(&doc)?;

            tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
                .await
                .map_err(|e| FastlaneError::Store(format!("store write task failed: {e}")))??;

            *self.records.write().unwrap_or_else(|e| e.into_inner()) = doc.shared_files;
        } else {
            *self.records.write().unwrap_or_else(|e| e.into_inner()) = records;
        }

        Ok(())
    }
}

fn check_unique(records: &[ShareRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(FastlaneError::Store(format!(
                "duplicate share id: {}",
                record.id
            )));
        }
    }
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    // The temp file must live on the same filesystem for the rename to be atomic.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| FastlaneError::Io(e.error))?;

    Ok(())
}
