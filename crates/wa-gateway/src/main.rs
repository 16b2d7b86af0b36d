//! wa-gateway: WhatsApp chatbot gateway binary
//!
//! Usage:
//!   wa-gateway                  - Start the HTTP API server
//!   wa-gateway --config <path>  - Start with an explicit config file
//!   wa-gateway --help           - Show help

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wa_api::AppState;
use wa_core::{ChatbotProcessor, Config, ProviderClient, SettingsService, SqliteStore};

/// Run mode
enum RunMode {
    /// Server mode, optionally with an explicit config file
    Server { config_path: Option<String> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config_path = match parse_args(std::env::args().skip(1))? {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("wa-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server { config_path } => config_path,
    };

    // Load .env file
    dotenvy::dotenv().ok();

    let config = match config_path {
        Some(path) => Config::from_toml_file(&path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting wa-gateway...");
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Provider timeout: {:?}", config.provider.timeout());

    let store = Arc::new(
        SqliteStore::new(&config.database.path)
            .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?,
    );
    let provider = ProviderClient::new(config.provider.timeout())
        .map_err(|e| anyhow::anyhow!("Failed to create provider client: {}", e))?;

    if config.api.key.is_none() {
        tracing::warn!("API_KEY is not set; the HTTP API accepts unauthenticated requests");
    }

    let state = AppState {
        settings: SettingsService::new(store.clone()),
        processor: ChatbotProcessor::new(store.clone(), store, provider),
        config,
    };

    wa_api::start_server(state).await
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<RunMode> {
    let mut args = args.into_iter();
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(path);
            }
            other => tracing::warn!("Ignoring unknown argument: {}", other),
        }
    }

    Ok(RunMode::Server { config_path })
}

/// Print help message
fn print_help() {
    println!("wa-gateway - WhatsApp chatbot gateway");
    println!();
    println!("Usage:");
    println!("  wa-gateway                  Start the HTTP API server");
    println!("  wa-gateway --config <path>  Use an explicit TOML config file");
    println!("  wa-gateway --help           Show this help message");
    println!("  wa-gateway --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  API_KEY                 Bearer key required by the HTTP API (optional)");
    println!("  API_PORT                HTTP API port (default: 3000)");
    println!("  API_ALLOWED_ORIGINS     Comma-separated CORS origins");
    println!("  DB_PATH                 SQLite database path (default: data/wa-chatbot.db)");
    println!("  PROVIDER_TIMEOUT_SECS   Outbound provider timeout (default: 30)");
    println!("  RUST_LOG                Log filter (default: info)");
}
