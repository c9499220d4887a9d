//! In-process interface for the desktop shell.
//!
//! The shell (window, file dialog, views) lives outside this crate. It talks
//! to the registry through [`ShareBridge`], whose results serialize to the
//! JSON shapes the views consume.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::share::{
    parse_lifetime, CreatedShare, LookupOutcome, ShareContent, ShareRecord, ShareService,
};
use crate::Result;

/// Native file chooser provided by the shell.
pub trait FilePicker: Send + Sync {
    /// Ask the user for a file. `None` if the dialog was cancelled.
    fn pick_file(&self) -> Option<PathBuf>;
}

/// Picker for headless runs; never selects anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPicker;

impl FilePicker for NoPicker {
    fn pick_file(&self) -> Option<PathBuf> {
        None
    }
}

/// A share as listed in the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareEntry {
    #[serde(flatten)]
    pub record: ShareRecord,
    pub share_link: String,
    /// Past expiry but not swept yet.
    pub expired: bool,
}

/// Marker returned for an expired share.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExpiredMarker {
    pub expired: bool,
}

/// Reply to [`ShareBridge::get_share_content`] for a known id.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContentReply {
    Available(ShareContent),
    Expired(ExpiredMarker),
}

/// Shell-facing facade over [`ShareService`].
#[derive(Clone)]
pub struct ShareBridge {
    service: Arc<ShareService>,
    picker: Arc<dyn FilePicker>,
}

impl ShareBridge {
    pub fn new(service: Arc<ShareService>, picker: Arc<dyn FilePicker>) -> Self {
        Self { service, picker }
    }

    /// Open the shell's file dialog.
    pub async fn pick_source_file(&self) -> Option<PathBuf> {
        let picker = Arc::clone(&self.picker);
        match tokio::task::spawn_blocking(move || picker.pick_file()).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, "File picker task failed");
                None
            }
        }
    }

    /// Share `path` for the number of days typed by the user.
    pub async fn create_share(&self, path: PathBuf, lifetime_days: &str) -> Result<CreatedShare> {
        let days = parse_lifetime(lifetime_days)?;
        self.service.create(path, i64::from(days)).await
    }

    /// All shares, flagging the ones past expiry.
    pub fn list_shares(&self) -> Vec<ShareEntry> {
        let now = self.service.now();
        let links = self.service.links();
        self.service
            .list()
            .into_iter()
            .map(|record| ShareEntry {
                share_link: links.share_url(&record.id),
                expired: record.is_expired_at(now),
                record,
            })
            .collect()
    }

    pub async fn delete_share(&self, id: &str) -> Result<bool> {
        self.service.delete(id).await
    }

    /// Content of a share; `None` if the id is unknown.
    pub async fn get_share_content(&self, id: &str) -> Result<Option<ContentReply>> {
        Ok(match self.service.lookup(id).await? {
            LookupOutcome::Available(content) => Some(ContentReply::Available(content)),
            LookupOutcome::Expired => Some(ContentReply::Expired(ExpiredMarker { expired: true })),
            LookupOutcome::NotFound => None,
        })
    }

    /// Updated share lists pushed after a sweep evicts anything.
    pub fn on_shares_changed(&self) -> broadcast::Receiver<Vec<ShareRecord>> {
        self.service.subscribe()
    }
}
