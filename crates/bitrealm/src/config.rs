//! Configuration management for the Bitrealm game server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use anyhow::{Context, Result};
use bitrealm_engine::{MemoryStore, WorldSnapshot};
use bitrealm_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses the server,
/// the bundled document store and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Bundled store contents
    #[serde(default)]
    pub store: StoreSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, transport limits and the lifetime of ephemeral state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the TCP listener to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Address of the UDP side-channel; empty disables it
    #[serde(default = "default_udp_bind_address")]
    pub udp_bind_address: String,
    /// Maximum payload bytes per partition
    #[serde(default = "default_partition_limit")]
    pub partition_limit: usize,
    /// Deadline of each document store call, in seconds
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    /// Lifetime of unacknowledged responses, in seconds
    #[serde(default = "default_delivery_ttl_secs")]
    pub delivery_ttl_secs: u64,
    /// Lifetime of battle sessions, in seconds
    #[serde(default = "default_battle_ttl_secs")]
    pub battle_ttl_secs: u64,
    /// Interval of the maintenance sweep in seconds (0 to disable)
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    /// Monsters drawn per battle
    #[serde(default = "default_battle_monster_count")]
    pub battle_monster_count: usize,
    /// Level sent on login
    #[serde(default = "default_start_level")]
    pub start_level: String,
    /// Drop cached responses of a connection's accounts when it closes
    #[serde(default)]
    pub evict_on_disconnect: bool,
}

fn default_udp_bind_address() -> String {
    "127.0.0.1:8081".to_string()
}

fn default_partition_limit() -> usize {
    bitrealm_server::config::DEFAULT_PARTITION_LIMIT
}

fn default_store_timeout_secs() -> u64 {
    bitrealm_server::config::DEFAULT_STORE_TIMEOUT.as_secs()
}

fn default_delivery_ttl_secs() -> u64 {
    15 * 60
}

fn default_battle_ttl_secs() -> u64 {
    30 * 60
}

fn default_maintenance_interval_secs() -> u64 {
    60
}

fn default_battle_monster_count() -> usize {
    1
}

fn default_start_level() -> String {
    "00001".to_string()
}

/// Contents of the bundled in-memory document store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    /// JSON file holding the world tables
    #[serde(default)]
    pub world_file: Option<String>,
    /// Accounts registered at startup
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub username: String,
    pub password: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:8080".to_string(),
                udp_bind_address: default_udp_bind_address(),
                partition_limit: default_partition_limit(),
                store_timeout_secs: default_store_timeout_secs(),
                delivery_ttl_secs: default_delivery_ttl_secs(),
                battle_ttl_secs: default_battle_ttl_secs(),
                maintenance_interval_secs: default_maintenance_interval_secs(),
                battle_monster_count: default_battle_monster_count(),
                start_level: default_start_level(),
                evict_on_disconnect: false,
            },
            store: StoreSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            // Create default config file
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a game server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        let server = &self.server;
        let udp_bind_address = if server.udp_bind_address.is_empty() {
            None
        } else {
            Some(
                server
                    .udp_bind_address
                    .parse()
                    .context("parsing udp_bind_address")?,
            )
        };

        Ok(ServerConfig {
            bind_address: server.bind_address.parse().context("parsing bind_address")?,
            udp_bind_address,
            partition_limit: server.partition_limit,
            store_timeout: Duration::from_secs(server.store_timeout_secs),
            delivery_ttl: Duration::from_secs(server.delivery_ttl_secs),
            battle_ttl: Duration::from_secs(server.battle_ttl_secs),
            maintenance_interval: Duration::from_secs(server.maintenance_interval_secs),
            battle_monster_count: server.battle_monster_count,
            start_level: server.start_level.clone(),
            evict_on_disconnect: server.evict_on_disconnect,
        })
    }

    /// Builds the bundled store: world tables from `world_file` (if any) and
    /// the configured accounts.
    pub async fn build_store(&self) -> Result<MemoryStore> {
        let world = match &self.store.world_file {
            Some(path) => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading world file {path}"))?;
                serde_json::from_str::<WorldSnapshot>(&content)
                    .with_context(|| format!("parsing world file {path}"))?
            }
            None => WorldSnapshot::default(),
        };

        let store = MemoryStore::new().with_world(world);
        for account in &self.store.accounts {
            store.register(&account.username, &account.password).await;
        }
        Ok(store)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        let server = &self.server;

        if server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &server.bind_address));
        }
        if !server.udp_bind_address.is_empty()
            && server.udp_bind_address.parse::<SocketAddr>().is_err()
        {
            return Err(format!(
                "Invalid UDP bind address: {}",
                &server.udp_bind_address
            ));
        }

        if server.partition_limit == 0 {
            return Err("partition_limit must be at least 1".to_string());
        }
        if server.store_timeout_secs == 0 {
            return Err("store_timeout_secs must be at least 1".to_string());
        }
        if server.battle_monster_count == 0 {
            return Err("battle_monster_count must be at least 1".to_string());
        }
        if server.start_level.trim().is_empty() {
            return Err("start_level cannot be empty".to_string());
        }

        if let Some(account) = self
            .store
            .accounts
            .iter()
            .find(|account| account.username.is_empty())
        {
            return Err(format!("Account with empty username: {account:?}"));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
