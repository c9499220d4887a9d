//! Process wiring: registry, HTTP listener and expiry sweeper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::net::ShareLinks;
use crate::share::{ExpirySweeper, ShareService, SweeperHandle};
use crate::web::{RunningServer, WebServer};
use crate::Result;

/// A running Fastlane instance.
pub struct App {
    service: Arc<ShareService>,
    server: RunningServer,
    sweeper: SweeperHandle,
    shutdown: CancellationToken,
}

impl App {
    /// Start everything described by `config`.
    ///
    /// The listener is bound first so share links carry the real port. The
    /// registry is reconciled before the first request is served, and the
    /// sweeper starts once the server is up.
    pub async fn start(config: &Config) -> Result<Self> {
        config.validate()?;

        let listener = WebServer::bind(&config.server).await?;
        let links = ShareLinks::from_config(&config.server, listener.local_addr().port())?;
        info!("Share links use {}", links.base_url());

        let service = Arc::new(ShareService::open(&config.storage, links)?);
        let report = service.reconcile().await?;
        info!(
            shares = service.list().len(),
            dropped = report.dropped_records,
            orphans = report.removed_orphans,
            "Share registry loaded"
        );

        let shutdown = CancellationToken::new();
        let server = listener.serve(service.clone(), shutdown.clone());
        let sweeper = ExpirySweeper::with_interval(
            service.clone(),
            Duration::from_secs(config.sweep.interval_secs),
        )
        .start(&shutdown);

        Ok(Self {
            service,
            server,
            sweeper,
            shutdown,
        })
    }

    /// The share registry.
    pub fn service(&self) -> &Arc<ShareService> {
        &self.service
    }

    /// Address the HTTP server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.server.addr
    }

    /// Stop the sweeper and the server and wait for both.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down");
        self.shutdown.cancel();
        self.sweeper.shutdown().await;
        self.server.wait().await?;
        Ok(())
    }
}
