//! Core game server implementation.
//!
//! This module contains the main `GameServer` struct, which loads the world,
//! owns the listeners and spawns one task per client connection plus the UDP
//! loop and the maintenance sweep.

use crate::{
    config::ServerConfig,
    connection::handle_connection,
    context::ServerContext,
    error::ServerError,
    messaging::Dispatcher,
    udp::{run_udp_loop, UdpRegistry},
};
use bitrealm_engine::{DocumentStore, WorldCatalog};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, error, info};

/// The core game server structure.
///
/// `GameServer` ties the shared [`ServerContext`] to the network: it accepts
/// TCP clients, serves the UDP side-channel and periodically expires stale
/// battles and unacknowledged responses.
pub struct GameServer {
    /// Shared state handed to every handler
    context: ServerContext,

    /// Opcode table, built once
    dispatcher: Arc<Dispatcher>,

    /// Registered UDP clients
    udp_registry: Arc<UdpRegistry>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a new game server backed by `store`.
    ///
    /// The world catalog starts empty; [`GameServer::start`] fills it from
    /// the store before accepting clients.
    pub fn new(config: ServerConfig, store: Arc<dyn DocumentStore>) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            context: ServerContext::new(config, store, Arc::new(WorldCatalog::new())),
            dispatcher: Arc::new(Dispatcher::with_default_handlers()),
            udp_registry: Arc::new(UdpRegistry::new()),
            shutdown_sender,
        }
    }

    /// Starts the server and runs until shutdown.
    ///
    /// # Startup
    ///
    /// 1. Loads the world catalog from the document store
    /// 2. Binds the TCP listener
    /// 3. Binds the UDP side-channel, if configured
    /// 4. Starts the maintenance sweep, if configured
    /// 5. Runs the accept loop
    pub async fn start(&self) -> Result<(), ServerError> {
        let config = self.context.config();
        info!("🚀 Starting game server on {}", config.bind_address);

        self.load_world().await?;

        let listener = bind_listener(config.bind_address)?;
        info!("✅ Listener bound on {}", config.bind_address);

        if let Some(udp_address) = config.udp_bind_address {
            let socket = UdpSocket::bind(udp_address)
                .await
                .map_err(|e| ServerError::Network(format!("UDP bind failed: {e}")))?;
            info!("📡 UDP side-channel bound on {}", udp_address);
            tokio::spawn(run_udp_loop(
                socket,
                self.udp_registry.clone(),
                self.shutdown_sender.subscribe(),
            ));
        } else {
            info!("📭 UDP side-channel disabled");
        }

        if config.maintenance_interval.is_zero() {
            info!("⏸️ Maintenance sweep disabled");
        } else {
            self.start_maintenance();
            info!(
                "🕒 Maintenance sweep every {:?}",
                config.maintenance_interval
            );
        }

        self.serve(listener).await
    }

    /// Loads every world table from the document store into the catalog.
    pub async fn load_world(&self) -> Result<(), ServerError> {
        let ctx = &self.context;
        let snapshot = ctx
            .store_call("load_world", ctx.store().load_world())
            .await
            .map_err(|e| ServerError::Internal(format!("World load failed: {e}")))?;
        ctx.catalog().load(snapshot);
        Ok(())
    }

    /// Accepts clients on `listener` until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            };

            match accepted {
                Ok((stream, addr)) => {
                    let ctx = self.context.clone();
                    let dispatcher = self.dispatcher.clone();
                    let shutdown = self.shutdown_sender.subscribe();

                    // Spawn individual connection handler
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, ctx, dispatcher, shutdown).await
                        {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }

        info!(
            "Server stopped ({} cached response(s), {} live battle(s))",
            self.context.deliveries().len(),
            self.context.battles().len()
        );
        Ok(())
    }

    /// Spawns the periodic sweep of stale battles and unacknowledged responses.
    fn start_maintenance(&self) {
        let ctx = self.context.clone();
        let mut shutdown = self.shutdown_sender.subscribe();

        tokio::spawn(async move {
            let config = ctx.config();
            let mut ticker = interval(config.maintenance_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.recv() => break,
                }

                let responses = ctx.deliveries().sweep_expired(config.delivery_ttl);
                let battles = ctx.battles().sweep(config.battle_ttl);
                if responses > 0 || battles > 0 {
                    info!(
                        "🧹 Expired {} response(s) and {} battle(s)",
                        responses, battles
                    );
                } else {
                    debug!("🧹 Maintenance sweep found nothing to expire");
                }
            }
        });
    }

    /// Initiates server shutdown.
    ///
    /// Signals the accept loop, every connection task, the UDP loop and the
    /// maintenance sweep to stop.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    pub fn get_context(&self) -> &ServerContext {
        &self.context
    }

    pub fn get_udp_registry(&self) -> Arc<UdpRegistry> {
        self.udp_registry.clone()
    }
}

/// Binds a TCP listener with address reuse enabled.
pub fn bind_listener(address: SocketAddr) -> Result<TcpListener, ServerError> {
    let domain = if address.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
    socket.set_reuse_address(true).ok();

    socket
        .bind(&address.into())
        .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
    socket
        .listen(1024)
        .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

    let std_listener: StdTcpListener = socket.into();
    std_listener
        .set_nonblocking(true)
        .map_err(|e| ServerError::Network(format!("Nonblocking mode failed: {e}")))?;

    TcpListener::from_std(std_listener)
        .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))
}
