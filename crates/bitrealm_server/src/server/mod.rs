//! Server lifecycle: world loading, listeners, background maintenance and
//! shutdown.

mod core;

pub use self::core::{bind_listener, GameServer};
