//! Fastlane - temporary file sharing over the local network
//!
//! Files are copied into a private upload directory, registered with an
//! expiry date, and served to peers at `http://<lan-ip>:<port>/download/<id>`
//! until they expire and are swept.

pub mod app;
pub mod bridge;
pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod net;
pub mod share;
pub mod web;

pub use app::App;
pub use bridge::{FilePicker, NoPicker, ShareBridge, ShareEntry};
pub use config::Config;
pub use datetime::{Clock, ManualClock, SystemClock};
pub use error::{FastlaneError, Result};
pub use net::ShareLinks;
pub use share::{
    BlobDirectory, CreatedShare, ExpirySweeper, LookupOutcome, RecordStore, ShareRecord,
    ShareService,
};
pub use web::WebServer;
