//! Test helpers for integration tests.
//!
//! Provides a share registry on a temporary directory with a manual clock,
//! and an in-process HTTP test server on top of it.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use fastlane::config::StorageConfig;
use fastlane::web::handlers::AppState;
use fastlane::web::router::{create_health_router, create_router};
use fastlane::{ManualClock, ShareLinks, ShareService};

/// Host advertised in share links during tests.
pub const TEST_HOST: &str = "192.168.1.5";

/// Port advertised in share links during tests.
pub const TEST_PORT: u16 = 3720;

/// Fixed starting time for the manual clock.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
}

/// A share registry persisted under a temporary directory.
pub struct TestRegistry {
    pub dir: TempDir,
    pub clock: ManualClock,
    pub service: Arc<ShareService>,
}

impl TestRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let clock = ManualClock::new(start_time());
        let service = Self::open_service(&dir, &clock);
        Self {
            dir,
            clock,
            service,
        }
    }

    fn open_service(dir: &TempDir, clock: &ManualClock) -> Arc<ShareService> {
        let service = ShareService::open(
            &storage_config(dir),
            ShareLinks::new(TEST_HOST, TEST_PORT).expect("Failed to build links"),
        )
        .expect("Failed to open share service")
        .with_clock(Arc::new(clock.clone()));
        Arc::new(service)
    }

    /// Reopen the registry from disk, as after a restart.
    pub fn reopen(&self) -> Arc<ShareService> {
        Self::open_service(&self.dir, &self.clock)
    }

    /// Storage configuration pointing into the temporary directory.
    pub fn storage_config(&self) -> StorageConfig {
        storage_config(&self.dir)
    }

    /// Write a source file outside the upload directory.
    pub fn write_source(&self, name: &str, content: &[u8]) -> PathBuf {
        let sources = self.dir.path().join("sources");
        std::fs::create_dir_all(&sources).expect("Failed to create source dir");
        let path = sources.join(name);
        std::fs::write(&path, content).expect("Failed to write source file");
        path
    }

    /// Build an HTTP test server for this registry.
    pub fn test_server(&self) -> TestServer {
        let app_state = Arc::new(AppState::new(self.service.clone()));
        let router = create_router(app_state).merge(create_health_router());
        TestServer::new(router).expect("Failed to create test server")
    }
}

fn storage_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        data_dir: dir.path().join("data").to_string_lossy().into_owned(),
        ..Default::default()
    }
}
