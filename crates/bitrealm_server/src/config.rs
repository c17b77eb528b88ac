//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the game server behavior.

use std::net::SocketAddr;
use std::time::Duration;

/// Byte limit of one partition on the wire.
pub const DEFAULT_PARTITION_LIMIT: usize = 10_000;

/// Deadline applied to every document store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration structure for the game server.
///
/// Contains the network endpoints, transport limits, and the lifetimes of the
/// server's ephemeral state.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address the TCP listener binds to
    pub bind_address: SocketAddr,

    /// The socket address of the UDP side-channel (`None` disables it)
    pub udp_bind_address: Option<SocketAddr>,

    /// Maximum number of payload bytes carried by one partition
    pub partition_limit: usize,

    /// Deadline for each document store call
    pub store_timeout: Duration,

    /// How long an unacknowledged response stays resendable
    pub delivery_ttl: Duration,

    /// How long a battle session is kept after creation
    pub battle_ttl: Duration,

    /// Interval of the maintenance sweep (zero disables it)
    pub maintenance_interval: Duration,

    /// Number of monsters drawn for each new battle
    pub battle_monster_count: usize,

    /// Level sent to players on successful login
    pub start_level: String,

    /// Whether a closing connection drops the cached responses of the
    /// accounts it served
    pub evict_on_disconnect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            udp_bind_address: Some(SocketAddr::from(([127, 0, 0, 1], 8081))),
            partition_limit: DEFAULT_PARTITION_LIMIT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            delivery_ttl: Duration::from_secs(15 * 60),
            battle_ttl: Duration::from_secs(30 * 60),
            maintenance_interval: Duration::from_secs(60),
            battle_monster_count: 1,
            start_level: "00001".to_string(),
            evict_on_disconnect: false,
        }
    }
}
