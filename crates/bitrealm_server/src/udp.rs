//! UDP side-channel.
//!
//! Clients register their datagram address with `UDPC#` and then stream
//! position updates with `M1#`. Datagrams use the same opcode/field codec as
//! TCP lines but are never partitioned, cached or newline terminated.

use bitrealm_engine::Position;
use bitrealm_protocol::{decode, parse_field, split_fields, AccountId, ProtocolError};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub const REGISTER: &str = "UDPC#";
pub const MOVE: &str = "M1#";

/// Largest datagram read in one receive.
pub const DATAGRAM_BUFFER: usize = 1024;

/// A client known to the side-channel.
#[derive(Debug, Clone)]
pub struct UdpClient {
    pub account_id: AccountId,
    /// Address the registration datagram came from
    pub addr: SocketAddr,
    /// Broadcast address the client announced
    pub broadcast_addr: String,
    pub position: Position,
    pub last_seen: Instant,
}

/// Registered UDP clients keyed by account.
#[derive(Debug, Default)]
pub struct UdpRegistry {
    clients: DashMap<AccountId, UdpClient>,
}

impl UdpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or refreshes) a client. Returns `true` on first registration.
    pub fn register(&self, account_id: AccountId, addr: SocketAddr, broadcast_addr: &str) -> bool {
        let mut first = false;
        self.clients
            .entry(account_id)
            .and_modify(|client| {
                client.addr = addr;
                client.broadcast_addr = broadcast_addr.to_string();
                client.last_seen = Instant::now();
            })
            .or_insert_with(|| {
                first = true;
                UdpClient {
                    account_id,
                    addr,
                    broadcast_addr: broadcast_addr.to_string(),
                    position: Position::default(),
                    last_seen: Instant::now(),
                }
            });
        first
    }

    /// Moves a registered client. Returns `false` if the account never registered.
    pub fn update_position(&self, account_id: AccountId, position: Position) -> bool {
        match self.clients.get_mut(&account_id) {
            Some(mut client) => {
                client.position = position;
                client.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, account_id: AccountId) -> Option<UdpClient> {
        self.clients.get(&account_id).map(|client| client.clone())
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Handles one datagram, returning the reply to send back, if any.
    pub fn handle_datagram(
        &self,
        data: &[u8],
        from: SocketAddr,
    ) -> Result<Option<String>, ProtocolError> {
        let text = String::from_utf8_lossy(data);
        let frame = decode(&text)?;

        match frame.opcode {
            REGISTER => {
                let [account_id, broadcast_addr] = split_fields::<2>(frame.payload)?;
                let account_id: AccountId = parse_field("account_id", account_id)?;
                let first = self.register(account_id, from, broadcast_addr.trim());
                if first {
                    info!("📡 UDP client {} registered from {}", account_id, from);
                }
                Ok(Some(format!("{REGISTER}?CONNECTED TO SERVER:{first}")))
            }
            MOVE => {
                let [account_id, x, y, z] = split_fields::<4>(frame.payload)?;
                let account_id: AccountId = parse_field("account_id", account_id)?;
                let position = Position::new(
                    parse_field("x", x)?,
                    parse_field("y", y)?,
                    parse_field("z", z)?,
                );
                if !self.update_position(account_id, position) {
                    debug!("Movement from unregistered account {}", account_id);
                }
                Ok(None)
            }
            other => {
                debug!("Ignoring UDP opcode {} from {}", other, from);
                Ok(None)
            }
        }
    }
}

/// Serves the side-channel until shutdown.
pub async fn run_udp_loop(
    socket: UdpSocket,
    registry: Arc<UdpRegistry>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut buffer = [0u8; DATAGRAM_BUFFER];

    loop {
        let received = tokio::select! {
            received = socket.recv_from(&mut buffer) => received,
            _ = shutdown.recv() => break,
        };

        let (size, from) = match received {
            Ok(received) => received,
            Err(e) => {
                error!("UDP receive error: {}", e);
                continue;
            }
        };

        match registry.handle_datagram(&buffer[..size], from) {
            Ok(Some(reply)) => {
                if let Err(e) = socket.send_to(reply.as_bytes(), from).await {
                    warn!("Failed to answer UDP client {}: {}", from, e);
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Dropping datagram from {}: {}", from, e),
        }
    }

    info!("UDP loop stopped");
}
