//! Acknowledgment (`OK#`) and client-driven resend (`SOS#`).

use crate::context::ServerContext;
use crate::messaging::{HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_protocol::{parse_field, split_fields, AccountId, RequestId};
use tracing::debug;

pub const ACKNOWLEDGE: &str = "OK#";
pub const RESEND: &str = "SOS#";

fn parse_ids(payload: &str) -> Result<(RequestId, AccountId), HandlerError> {
    let [request_id, account_id] = split_fields::<2>(payload)?;
    Ok((
        parse_field("request_id", request_id)?,
        parse_field("account_id", account_id)?,
    ))
}

/// Drops a delivered response from the cache.
pub struct AcknowledgeHandler;

#[async_trait]
impl OpcodeHandler for AcknowledgeHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let (request_id, account_id) = parse_ids(payload)?;
        if !ctx.deliveries().acknowledge(account_id, request_id) {
            debug!(
                "Acknowledge for {} on account {} had nothing cached",
                request_id, account_id
            );
        }
        Ok(Reply::Nothing)
    }
}

/// Sends a cached response again. The copy is not recorded a second time.
pub struct ResendHandler;

#[async_trait]
impl OpcodeHandler for ResendHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let (request_id, account_id) = parse_ids(payload)?;
        match ctx.deliveries().resend(account_id, request_id) {
            Ok(packet) => {
                debug!("🔁 Resending {} to account {}", request_id, account_id);
                Ok(Reply::Transient(packet))
            }
            Err(e) => {
                debug!("🔁 Resend miss: {}", e);
                Ok(Reply::Nothing)
            }
        }
    }
}
