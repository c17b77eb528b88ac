//! Opcode dispatch.
//!
//! Each opcode maps to one [`OpcodeHandler`]. Handlers receive the decoded
//! payload and the shared [`ServerContext`], and describe what should go back
//! to the client as a [`Reply`]. Writing the reply, caching it, and
//! converting failures into error packets is the router's job.

use crate::context::ServerContext;
use async_trait::async_trait;
use bitrealm_engine::{BattleError, StoreError};
use bitrealm_protocol::{parse_field, AccountId, Packet, ProtocolError, RequestId};
use thiserror::Error;

pub mod handlers;
pub mod router;

pub use router::Dispatcher;

/// Opcode of the failure packet sent when a request cannot be served.
pub const ERROR_OPCODE: &str = "ER#";

/// Service tag of the failure packet.
pub const ERROR_SERVICE: &str = "ERROR";

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Record the packet in the delivery cache for `account_id`, then send it
    Deliver { account_id: AccountId, packet: Packet },
    /// Send the packet without caching it
    Transient(Packet),
    /// Send a plain text frame
    Raw(String),
    /// Send nothing
    Nothing,
}

/// Identifiers of the request being served, once they have been parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub request_id: RequestId,
    /// Unknown for requests made before login
    pub account_id: Option<AccountId>,
}

impl Envelope {
    /// Parses the request and account id fields common to most opcodes.
    pub fn parse(request_id: &str, account_id: &str) -> Result<Self, ProtocolError> {
        Ok(Self {
            request_id: parse_field("request_id", request_id)?,
            account_id: Some(parse_field("account_id", account_id)?),
        })
    }

    /// An envelope for a request that carries no account id.
    pub fn anonymous(request_id: RequestId) -> Self {
        Self {
            request_id,
            account_id: None,
        }
    }

    /// Wraps a response packet: cached when the account is known.
    pub fn reply(&self, packet: Packet) -> Reply {
        match self.account_id {
            Some(account_id) => Reply::Deliver { account_id, packet },
            None => Reply::Transient(packet),
        }
    }

    /// The failure packet answering this request.
    pub fn failure(&self, error: &HandlerError) -> Reply {
        self.reply(Packet::simple(
            self.request_id,
            ERROR_OPCODE,
            ERROR_SERVICE,
            error.to_string(),
        ))
    }
}

/// Why a handler could not produce its normal reply.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request was well formed but refers to something that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A failure for a request whose ids are known. The router answers these
    /// with an error packet; every other variant is only logged.
    #[error("{source}")]
    Request {
        envelope: Envelope,
        #[source]
        source: Box<HandlerError>,
    },
}

impl HandlerError {
    /// Attaches the request's envelope so the client gets an error packet.
    pub fn for_request(self, envelope: Envelope) -> Self {
        match self {
            already @ HandlerError::Request { .. } => already,
            other => HandlerError::Request {
                envelope,
                source: Box::new(other),
            },
        }
    }
}

/// Handles one opcode.
#[async_trait]
pub trait OpcodeHandler: Send + Sync {
    /// Serves one request.
    ///
    /// # Arguments
    ///
    /// * `payload` - Everything after the opcode, fields still joined by `?`
    /// * `ctx` - Shared server state
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError>;
}
