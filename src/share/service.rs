//! Share service.
//!
//! This module orchestrates the share lifecycle:
//! - Create: copy the source into the blob directory, then register the record
//! - Lookup: enforce expiry before touching the blob
//! - Delete: remove the record, then its blob
//! - Reconcile: drop records without blobs and blobs without records

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::fs::File;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use super::blob::BlobDirectory;
use super::record::ShareRecord;
use super::store::RecordStore;
use super::{CHANGE_CHANNEL_CAPACITY, MAX_LIFETIME_DAYS};
use crate::config::StorageConfig;
use crate::datetime::{Clock, SystemClock};
use crate::net::ShareLinks;
use crate::{FastlaneError, Result};

/// Result of looking a share up by id.
///
/// `Expired` and `NotFound` are kept apart so the HTTP layer can answer
/// 410 and 404 respectively.
#[derive(Debug)]
pub enum LookupOutcome<T> {
    /// The share exists and has not expired.
    Available(T),
    /// The share exists but its lifetime has elapsed.
    Expired,
    /// No share with this id.
    NotFound,
}

impl<T> LookupOutcome<T> {
    /// Map the available value, keeping the other variants.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LookupOutcome<U> {
        match self {
            LookupOutcome::Available(value) => LookupOutcome::Available(f(value)),
            LookupOutcome::Expired => LookupOutcome::Expired,
            LookupOutcome::NotFound => LookupOutcome::NotFound,
        }
    }

    /// The available value, if any.
    pub fn available(self) -> Option<T> {
        match self {
            LookupOutcome::Available(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this is the `Expired` variant.
    pub fn is_expired(&self) -> bool {
        matches!(self, LookupOutcome::Expired)
    }

    /// Whether this is the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupOutcome::NotFound)
    }

    /// Turn `Expired` and `NotFound` into errors naming share `id`.
    pub fn into_result(self, id: &str) -> Result<T> {
        match self {
            LookupOutcome::Available(value) => Ok(value),
            LookupOutcome::Expired => Err(FastlaneError::Expired(id.to_string())),
            LookupOutcome::NotFound => Err(FastlaneError::NotFound(id.to_string())),
        }
    }
}

/// A newly created share with its download link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShare {
    /// The registered record.
    #[serde(flatten)]
    pub record: ShareRecord,
    /// Download URL for the share.
    pub share_link: String,
}

/// Share metadata together with the blob bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ShareContent {
    /// The share record.
    #[serde(flatten)]
    pub record: ShareRecord,
    /// Blob content.
    pub content: Vec<u8>,
}

/// Outcome of [`ShareService::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records dropped because their blob was missing.
    pub dropped_records: usize,
    /// Blob files deleted because no record referenced them.
    pub removed_orphans: usize,
}

/// Validate a lifetime in days.
pub fn validate_lifetime(days: i64) -> Result<u32> {
    if days <= 0 {
        return Err(FastlaneError::InvalidInput(format!(
            "lifetime must be a positive number of days, got {days}"
        )));
    }
    if days > i64::from(MAX_LIFETIME_DAYS) {
        return Err(FastlaneError::InvalidInput(format!(
            "lifetime must be at most {MAX_LIFETIME_DAYS} days, got {days}"
        )));
    }
    // Bounded by MAX_LIFETIME_DAYS above.
    Ok(days as u32)
}

/// Parse a lifetime entered as text, e.g. from a form field.
pub fn parse_lifetime(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let days: i64 = trimmed.parse().map_err(|_| {
        FastlaneError::InvalidInput(format!(
            "lifetime must be a whole number of days, got {trimmed:?}"
        ))
    })?;
    validate_lifetime(days)
}

/// Share service coordinating the record store and the blob directory.
pub struct ShareService {
    pub(super) store: RecordStore,
    pub(super) blobs: BlobDirectory,
    pub(super) clock: Arc<dyn Clock>,
    /// Serializes every read-modify-write of the record store.
    pub(super) write_lock: Mutex<()>,
    pub(super) changes: broadcast::Sender<Vec<ShareRecord>>,
    links: ShareLinks,
}

impl ShareService {
    /// Create a new ShareService using the system clock.
    pub fn new(store: RecordStore, blobs: BlobDirectory, links: ShareLinks) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            blobs,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
            changes,
            links,
        }
    }

    /// Open the store and blob directory described by `config`.
    pub fn open(config: &StorageConfig, links: ShareLinks) -> Result<Self> {
        let store = RecordStore::open(config.store_path())?;
        let blobs = BlobDirectory::new(config.uploads_path())?;
        Ok(Self::new(store, blobs, links))
    }

    /// Use a custom clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Link builder used for share URLs.
    pub fn links(&self) -> &ShareLinks {
        &self.links
    }

    /// Blob directory backing this service.
    pub fn blobs(&self) -> &BlobDirectory {
        &self.blobs
    }

    /// Current time according to the service clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Subscribe to the valid share list published after a sweep evicts anything.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<ShareRecord>> {
        self.changes.subscribe()
    }

    /// Share a local file for `lifetime_days` days.
    ///
    /// The blob is copied before the record is registered. If registration
    /// fails the blob is removed again, so no record exists without a blob
    /// and no blob is left without a record.
    pub async fn create(&self, source: impl AsRef<Path>, lifetime_days: i64) -> Result<CreatedShare> {
        let source = source.as_ref();
        let expiry_days = validate_lifetime(lifetime_days)?;

        let metadata = tokio::fs::metadata(source).await.map_err(|e| {
            FastlaneError::SourceUnavailable(format!("{}: {e}", source.display()))
        })?;
        if !metadata.is_file() {
            return Err(FastlaneError::SourceUnavailable(format!(
                "{}: not a regular file",
                source.display()
            )));
        }
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                FastlaneError::SourceUnavailable(format!("{}: no file name", source.display()))
            })?;

        let id = Uuid::new_v4().to_string();
        let (path, size) = self.blobs.store(source, &id).await.map_err(|e| {
            tracing::error!(source = %source.display(), error = %e, "Failed to copy file");
            e
        })?;

        let record = ShareRecord::new(id, name, size, path, self.clock.now(), expiry_days);

        let registered = {
            let _guard = self.write_lock.lock().await;
            let mut records = self.store.list();
            records.push(record.clone());
            self.store.upsert_all(records).await
        };

        if let Err(e) = registered {
            tracing::error!(id = %record.id, error = %e, "Failed to register share");
            self.discard_blob(&record).await;
            return Err(e);
        }

        tracing::info!(
            id = %record.id,
            name = %record.name,
            size = record.size,
            expires = %record.expiry_date,
            "File shared"
        );

        Ok(CreatedShare {
            share_link: self.links.share_url(&record.id),
            record,
        })
    }

    /// All registered shares in creation order, including expired ones
    /// that have not been swept yet.
    pub fn list(&self) -> Vec<ShareRecord> {
        self.store.list()
    }

    /// Check a share's status without touching its blob.
    pub fn describe(&self, id: &str) -> LookupOutcome<ShareRecord> {
        match self.store.get(id) {
            None => LookupOutcome::NotFound,
            Some(record) if record.is_expired_at(self.clock.now()) => LookupOutcome::Expired,
            Some(record) => LookupOutcome::Available(record),
        }
    }

    /// Look a share up and read its content into memory.
    pub async fn lookup(&self, id: &str) -> Result<LookupOutcome<ShareContent>> {
        let record = match self.describe(id) {
            LookupOutcome::Available(record) => record,
            LookupOutcome::Expired => return Ok(LookupOutcome::Expired),
            LookupOutcome::NotFound => return Ok(LookupOutcome::NotFound),
        };

        match self.blobs.read(&record.path).await {
            Ok(content) => Ok(LookupOutcome::Available(ShareContent { record, content })),
            Err(e) => self.blob_unreadable(&record, e),
        }
    }

    /// Look a share up and open its blob for streaming.
    pub async fn open_download(&self, id: &str) -> Result<LookupOutcome<(ShareRecord, File)>> {
        let record = match self.describe(id) {
            LookupOutcome::Available(record) => record,
            LookupOutcome::Expired => return Ok(LookupOutcome::Expired),
            LookupOutcome::NotFound => return Ok(LookupOutcome::NotFound),
        };

        match self.blobs.open(&record.path).await {
            Ok(file) => Ok(LookupOutcome::Available((record, file))),
            Err(e) => self.blob_unreadable(&record, e),
        }
    }

    /// Delete a share.
    ///
    /// Returns `false` without touching the store if the id is unknown.
    /// A failure to delete the blob is logged; the record is removed anyway.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let removed = {
            let _guard = self.write_lock.lock().await;
            let mut records = self.store.list();
            let Some(pos) = records.iter().position(|r| r.id == id) else {
                return Ok(false);
            };
            let removed = records.remove(pos);
            self.store.upsert_all(records).await?;
            removed
        };

        self.discard_blob(&removed).await;
        tracing::info!(id = %removed.id, name = %removed.name, "Share deleted");

        Ok(true)
    }

    /// Restore the one-record-one-blob invariant after a crash or manual edits.
    ///
    /// Must run before the service handles requests: a create in flight
    /// has a blob that is not registered yet.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let _guard = self.write_lock.lock().await;
        let mut report = ReconcileReport::default();

        let (kept, dangling): (Vec<_>, Vec<_>) = self
            .store
            .list()
            .into_iter()
            .partition(|r| self.blobs.exists(&r.path));

        if !dangling.is_empty() {
            for record in &dangling {
                tracing::warn!(
                    id = %record.id,
                    path = %record.path.display(),
                    "Dropping share whose blob is missing"
                );
            }
            self.store.upsert_all(kept.clone()).await?;
            report.dropped_records = dangling.len();
        }

        let referenced: HashSet<OsString> = kept
            .iter()
            .filter_map(|r| r.path.file_name().map(|n| n.to_os_string()))
            .collect();

        for blob in self.blobs.list_blobs()? {
            let is_referenced = blob
                .file_name()
                .is_some_and(|name| referenced.contains(name));
            if is_referenced {
                continue;
            }
            match self.blobs.delete(&blob).await {
                Ok(_) => {
                    tracing::info!(path = %blob.display(), "Removed orphan blob");
                    report.removed_orphans += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %blob.display(), error = %e, "Failed to remove orphan blob")
                }
            }
        }

        Ok(report)
    }

    /// Delete a record's blob, logging instead of failing.
    ///
    /// Returns `false` only if the blob could not be deleted and is leaked.
    pub(super) async fn discard_blob(&self, record: &ShareRecord) -> bool {
        match self.blobs.delete(&record.path).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    id = %record.id,
                    path = %record.path.display(),
                    error = %e,
                    "Failed to delete blob, leaking it"
                );
                false
            }
        }
    }

    /// Classify a blob read failure for a record that passed the expiry check.
    fn blob_unreadable<T>(&self, record: &ShareRecord, err: FastlaneError) -> Result<LookupOutcome<T>> {
        let missing = matches!(&err, FastlaneError::Io(e) if e.kind() == io::ErrorKind::NotFound);

        // Deleted or swept between the check and the read.
        if missing && self.store.get(&record.id).is_none() {
            return Ok(LookupOutcome::NotFound);
        }

        tracing::error!(
            id = %record.id,
            path = %record.path.display(),
            error = %err,
            "Failed to read blob for live share"
        );
        if missing {
            Err(FastlaneError::BlobMissing(record.id.clone()))
        } else {
            Err(err)
        }
    }
}
