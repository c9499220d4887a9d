//! HTTP handlers.

use std::sync::Arc;

use crate::share::ShareService;

pub mod download;

pub use download::*;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The share registry.
    pub shares: Arc<ShareService>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(shares: Arc<ShareService>) -> Self {
        Self { shares }
    }
}
