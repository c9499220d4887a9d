//! Web server for Fastlane.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::share::ShareService;
use crate::{FastlaneError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// A bound listener that has not started serving yet.
///
/// Binding comes first so the actual port (the configured one, or an
/// ephemeral one for port 0) is known before share links are built.
pub struct WebServer {
    listener: TcpListener,
    addr: SocketAddr,
}

/// A server accepting connections in a background task.
pub struct RunningServer {
    /// Address actually bound.
    pub addr: SocketAddr,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    /// Wait for the server to finish after its shutdown token is cancelled.
    pub async fn wait(self) -> std::io::Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
        }
    }
}

impl WebServer {
    /// Bind the listen address from `config`.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                FastlaneError::Config(format!(
                    "invalid listen address {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        Ok(Self { listener, addr })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve `shares` in a background task until `shutdown` is cancelled.
    pub fn serve(self, shares: Arc<ShareService>, shutdown: CancellationToken) -> RunningServer {
        let router = create_router(Arc::new(AppState::new(shares))).merge(create_health_router());
        let Self { listener, addr } = self;

        tracing::info!("Web server listening on http://{}", addr);

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = &result {
                tracing::error!("Web server error: {}", e);
            }
            tracing::info!("Web server stopped");
            result
        });

        RunningServer { addr, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::ManualClock;
    use crate::net::ShareLinks;
    use crate::share::{BlobDirectory, RecordStore};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Use random port
            public_host: Some("127.0.0.1".to_string()),
        }
    }

    fn create_service(dir: &TempDir, clock: &ManualClock, port: u16) -> Arc<ShareService> {
        Arc::new(
            ShareService::new(
                RecordStore::in_memory(),
                BlobDirectory::new(dir.path().join("uploads")).unwrap(),
                ShareLinks::from_config(&create_test_config(), port).unwrap(),
            )
            .with_clock(Arc::new(clock.clone())),
        )
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = WebServer::bind(&create_test_config()).await.unwrap();
        assert_eq!(server.local_addr().ip().to_string(), "127.0.0.1");
        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_invalid_host() {
        let config = ServerConfig {
            host: "not an address".to_string(),
            ..create_test_config()
        };
        let result = WebServer::bind(&config).await;
        assert!(matches!(result, Err(FastlaneError::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

        let server = WebServer::bind(&create_test_config()).await.unwrap();
        let service = create_service(&dir, &clock, server.local_addr().port());

        let source = dir.path().join("report.pdf");
        std::fs::write(&source, b"%PDF-1.4").unwrap();
        let created = service.create(&source, 1).await.unwrap();

        let shutdown = CancellationToken::new();
        let running = server.serve(service, shutdown.clone());

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", running.addr))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");

        // The advertised link points at the bound port.
        let resp = client.get(&created.share_link).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()["content-disposition"],
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(resp.headers()["content-type"], "application/pdf");
        assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF-1.4");

        clock.advance(Duration::days(2));
        let resp = client.get(&created.share_link).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::GONE);

        shutdown.cancel();
        running.wait().await.unwrap();
    }
}
