//! HTTP download endpoint for Fastlane.
//!
//! Peers on the local network fetch shared files with `GET /download/{id}`.
//! The server only reads the registry; it never creates or removes shares.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_health_router, create_router};
pub use server::{RunningServer, WebServer};
