//! # Bitrealm Server
//!
//! The game server behind Bitrealm clients. It speaks the line protocol from
//! `bitrealm_protocol` over TCP, answers every opcode through a table of
//! handlers, and drives the battle, leveling and world components of
//! `bitrealm_engine`.
//!
//! ## Architecture Overview
//!
//! * **[`GameServer`]** - loads the world, accepts clients, runs the UDP
//!   side-channel and the maintenance sweep, coordinates shutdown
//! * **Connections** - one task per client reading request lines and
//!   writing replies; partitions of one reply are never interleaved with
//!   another
//! * **[`Dispatcher`]** - opcode table built once at startup
//! * **[`ServerContext`]** - the document store, world catalog, battle table
//!   and delivery cache shared by every handler
//!
//! ### Message Flow
//!
//! 1. Client sends `OPCODE#field?field?...` terminated by a newline
//! 2. The line is decoded; `STOP` ends the session
//! 3. The dispatcher runs the opcode's handler, which returns a [`Reply`]
//! 4. Cached replies are recorded in the delivery cache, then written
//! 5. The client acknowledges with `OK#` or asks again with `SOS#`
//!
//! ## Error Handling
//!
//! Handler failures never close a connection. A failure whose request id is
//! known is answered with an `ER#` packet; anything else is logged and the
//! line is dropped. Only socket errors end a connection task, and only
//! [`ServerError`] stops the server.

pub use config::ServerConfig;
pub use context::ServerContext;
pub use error::ServerError;
pub use messaging::{Dispatcher, Reply};
pub use server::GameServer;

pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod messaging;
pub mod server;
pub mod udp;
