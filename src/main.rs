use tracing::{error, info};

use fastlane::{App, Config};

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "FASTLANE_CONFIG";

#[tokio::main]
async fn main() {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = fastlane::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        fastlane::logging::init_console_only(&config.logging.level);
    }

    // After logging, so rejected overrides are reported
    config.apply_env_overrides();

    info!("Fastlane - local network file sharing");

    let app = match App::start(&config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Fatal error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    if let Err(e) = app.shutdown().await {
        error!("Shutdown error: {}", e);
        std::process::exit(1);
    }
}
