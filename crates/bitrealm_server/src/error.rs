//! Error types for server startup and operation.

use thiserror::Error;

/// Errors that can stop the server.
///
/// Per-connection failures never surface here; they are logged and end only
/// the affected connection task.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Binding or socket configuration failed.
    #[error("Network error: {0}")]
    Network(String),

    /// A startup dependency (such as the world load) failed.
    #[error("Internal error: {0}")]
    Internal(String),
}
