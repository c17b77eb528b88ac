//! Main application entry point for the Bitrealm game server.
//!
//! Parses the command line, loads and validates the configuration, sets up
//! logging, then runs the server until a termination signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{anyhow, Result};
use bitrealm_server::GameServer;
use cli::CliArgs;
use config::AppConfig;
use std::sync::Arc;
use tracing::{error, info};

/// The configured server and the settings it was built from.
struct Application {
    config: AppConfig,
    server: Arc<GameServer>,
}

impl Application {
    async fn new(args: CliArgs) -> Result<Self> {
        // Load configuration first (before logging setup)
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }
        if let Some(udp_bind_address) = args.udp_bind_address {
            config.server.udp_bind_address = udp_bind_address;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

        logging::setup_logging(&config.logging, args.json_logs)?;

        let store = config.build_store().await?;
        let server = GameServer::new(config.to_server_config()?, Arc::new(store));

        info!(
            "🌍 Bitrealm server v{} | Config: {}",
            env!("CARGO_PKG_VERSION"),
            args.config_path.display()
        );
        Ok(Self {
            config,
            server: Arc::new(server),
        })
    }

    async fn run(self) -> Result<()> {
        info!("📋 Configuration Summary:");
        info!("  🌐 TCP bind address: {}", self.config.server.bind_address);
        info!("  📡 UDP bind address: {}", self.config.server.udp_bind_address);
        info!(
            "  📦 Partition limit: {} bytes",
            self.config.server.partition_limit
        );
        info!(
            "  ⏱️ Store timeout: {}s",
            self.config.server.store_timeout_secs
        );
        info!(
            "  👥 Bundled accounts: {}",
            self.config.store.accounts.len()
        );

        let server = self.server.clone();
        let mut server_handle = tokio::spawn(async move { server.start().await });

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let stopped_on_its_own = tokio::select! {
            signal = signals::wait_for_shutdown_signal() => {
                signal?;
                false
            }
            finished = &mut server_handle => {
                finished??;
                true
            }
        };

        if !stopped_on_its_own {
            info!("🛑 Shutdown signal received, initiating graceful shutdown...");
            self.server.shutdown().await?;
            server_handle.await??;
        }

        info!("✅ Bitrealm server shutdown complete");
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    let result = match Application::new(args).await {
        Ok(app) => app.run().await,
        Err(e) => {
            eprintln!("❌ Failed to start application: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        error!("❌ Application error: {:#}", e);
        std::process::exit(1);
    }
}
