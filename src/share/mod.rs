//! Shared-file registry for Fastlane.
//!
//! This module provides the share lifecycle:
//! - Record store with whole-collection replace semantics
//! - Blob directory holding one copied file per share
//! - Share service (create, list, lookup, delete)
//! - Expiry sweep and its background task

mod blob;
mod record;
mod service;
mod store;
mod sweeper;

pub use blob::BlobDirectory;
pub use record::ShareRecord;
pub use service::{
    parse_lifetime, validate_lifetime, CreatedShare, LookupOutcome, ReconcileReport,
    ShareContent, ShareService,
};
pub use store::RecordStore;
pub use sweeper::{ExpirySweeper, SweepReport, SweeperHandle, DEFAULT_SWEEP_INTERVAL_SECS};

/// Longest lifetime a share may be created with (about ten years).
pub const MAX_LIFETIME_DAYS: u32 = 3650;

/// Buffered change notifications per subscriber.
const CHANGE_CHANNEL_CAPACITY: usize = 16;
