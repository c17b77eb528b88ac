//! Connection management for client connections.
//!
//! Each accepted TCP connection is served by one task that reads request
//! lines, dispatches them and writes the replies. The task owns its socket's
//! write half, so the partitions of one response are always contiguous on
//! the wire.

pub mod client;
pub mod handler;
pub mod response;

pub use client::ClientConnection;
pub use handler::{handle_connection, serve_connection};
pub use response::ResponseWriter;
