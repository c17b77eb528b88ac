//! Error types for decoding, transport and the delivery cache.

use crate::types::{AccountId, RequestId};
use thiserror::Error;

/// Errors raised while decoding a request or building a response.
///
/// None of these are fatal to a connection: the dispatcher drops the offending
/// packet (or answers with a failure packet) and keeps reading.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed packet, no opcode terminator in {0:?}")]
    MalformedPacket(String),

    #[error("expected {expected} fields but found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("malformed reward matrix {0:?}")]
    MalformedRewardMatrix(String),

    #[error("invalid value {value:?} for field `{field}`")]
    InvalidField { field: &'static str, value: String },

    #[error("partition limit must be at least one byte")]
    InvalidLimit,

    #[error("unexpected partition {found:?}, expected index {expected}")]
    UnexpectedPartition { expected: usize, found: String },

    #[error("failed to serialize packet: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while writing frames to a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The socket failed. This is the only error that ends a connection.
    #[error("connection write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivery cache lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("no cached response {request_id} for account {account_id}")]
    NotFound {
        account_id: AccountId,
        request_id: RequestId,
    },
}
