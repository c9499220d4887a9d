//! Share record model.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one shared file.
///
/// Serialized with camelCase field names; this is the on-disk shape of each
/// entry in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    /// Unique identifier (UUID v4), also the blob's key.
    pub id: String,
    /// Original file name.
    pub name: String,
    /// Size in bytes at copy time.
    pub size: u64,
    /// Location of the blob owned by this record.
    pub path: PathBuf,
    /// When the share was created.
    pub upload_date: DateTime<Utc>,
    /// When the share stops being downloadable.
    pub expiry_date: DateTime<Utc>,
    /// Requested lifetime in days.
    pub expiry_days: u32,
}

impl ShareRecord {
    /// Build a record whose expiry is exactly `expiry_days` days after `upload_date`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        path: impl Into<PathBuf>,
        upload_date: DateTime<Utc>,
        expiry_days: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            path: path.into(),
            upload_date,
            expiry_date: upload_date + Duration::days(i64::from(expiry_days)),
            expiry_days,
        }
    }

    /// Whether the share is expired at `now`.
    ///
    /// A share is still valid at the exact expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }
}
