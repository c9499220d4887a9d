//! Configuration module for Fastlane.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{FastlaneError, Result};

/// Default HTTP port for the download endpoint.
pub const DEFAULT_PORT: u16 = 3720;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host advertised in share links. Detected from the network interfaces when unset.
    ///
    /// Share links always carry the port actually bound, so `port = 0` works.
    #[serde(default)]
    pub public_host: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_host: None,
        }
    }
}

/// Storage layout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all persisted state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Record store file name, relative to `data_dir`.
    #[serde(default = "default_store_file")]
    pub store_file: String,
    /// Blob directory name, relative to `data_dir`.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_store_file() -> String {
    "file-share-data.json".to_string()
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_file: default_store_file(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

impl StorageConfig {
    /// Full path of the record store file.
    pub fn store_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.store_file)
    }

    /// Full path of the blob directory.
    pub fn uploads_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.uploads_dir)
    }
}

/// Expiry sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    86400 // daily
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/fastlane.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Sweep configuration.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FastlaneError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FastlaneError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: Override the HTTP port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) if port.trim().is_empty() => {}
                Err(e) => tracing::warn!(value = %port, error = %e, "Ignoring invalid PORT"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sweep.interval_secs == 0 {
            return Err(FastlaneError::Config(
                "sweep.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.storage.data_dir.trim().is_empty()
            || self.storage.store_file.trim().is_empty()
            || self.storage.uploads_dir.trim().is_empty()
        {
            return Err(FastlaneError::Config(
                "storage paths must not be empty".to_string(),
            ));
        }
        if let Some(host) = &self.server.public_host {
            if host.trim().is_empty() {
                return Err(FastlaneError::Config(
                    "server.public_host must not be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3720);
        assert!(config.server.public_host.is_none());

        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.storage.store_file, "file-share-data.json");
        assert_eq!(config.storage.uploads_dir, "uploads");

        assert_eq!(config.sweep.interval_secs, 86400);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/fastlane.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
public_host = "192.168.1.20"

[storage]
data_dir = "custom"
store_file = "shares.json"
uploads_dir = "blobs"

[sweep]
interval_secs = 60

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_host.as_deref(), Some("192.168.1.20"));

        assert_eq!(config.storage.store_path(), Path::new("custom/shares.json"));
        assert_eq!(config.storage.uploads_path(), Path::new("custom/blobs"));

        assert_eq!(config.sweep.interval_secs, 60);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 4000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.sweep.interval_secs, 86400);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(
            config.storage.store_path(),
            Path::new("data/file-share-data.json")
        );
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(FastlaneError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");

        assert!(matches!(result, Err(FastlaneError::Io(_))));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_apply_env_overrides_port() {
        let original = std::env::var("PORT").ok();

        std::env::set_var("PORT", "5050");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 5050);

        std::env::set_var("PORT", "not-a-port");
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let mut config = Config::default();
        tracing::subscriber::with_default(subscriber, || config.apply_env_overrides());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(logs.contents().contains("Ignoring invalid PORT"));

        if let Some(val) = original {
            std::env::set_var("PORT", val);
        } else {
            std::env::remove_var("PORT");
        }
    }

    #[test]
    fn test_validate_default() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default();
        config.sweep.interval_secs = 0;

        let result = config.validate();
        assert!(matches!(result, Err(FastlaneError::Config(msg)) if msg.contains("interval_secs")));
    }

    #[test]
    fn test_validate_empty_public_host() {
        let mut config = Config::default();
        config.server.public_host = Some("  ".to_string());

        assert!(config.validate().is_err());
    }
}
