//! Streamed experience (`LU#`) and position heartbeats (`HB#`).

use crate::context::ServerContext;
use crate::messaging::{Envelope, HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_engine::{is_valid_streamed, Position};
use bitrealm_protocol::{parse_field, split_fields, AccountId, Packet, ProtocolError};
use tracing::debug;

pub const LEVEL_UP: &str = "LU#";
pub const HEARTBEAT: &str = "HB#";

/// Grants experience earned outside of battles.
pub struct LevelUpHandler;

#[async_trait]
impl OpcodeHandler for LevelUpHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, account_id, streamed] = split_fields::<3>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;

        grant(envelope, streamed, ctx)
            .await
            .map_err(|e| e.for_request(envelope))
    }
}

async fn grant(envelope: Envelope, streamed: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
    let account_id = envelope
        .account_id
        .ok_or_else(|| HandlerError::NotFound("level up without account".to_string()))?;

    let amount: f64 = parse_field("streamed_exp", streamed)?;
    if !is_valid_streamed(amount) {
        return Err(ProtocolError::InvalidField {
            field: "streamed_exp",
            value: streamed.to_string(),
        }
        .into());
    }

    let profile = ctx
        .store_call(
            "apply_experience",
            ctx.store().apply_experience(account_id, amount),
        )
        .await?;
    debug!(
        "✨ Account {} gained {} exp (level {}, total {})",
        account_id, amount, profile.level, profile.total_exp
    );

    Ok(envelope.reply(Packet::simple(
        envelope.request_id,
        LEVEL_UP,
        "EXP",
        profile.total_exp.to_string(),
    )))
}

/// Records the player's last known position. Heartbeats carry no request
/// id, so they are never answered, not even on failure.
pub struct HeartbeatHandler;

#[async_trait]
impl OpcodeHandler for HeartbeatHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [account_id, x, y, z] = split_fields::<4>(payload)?;
        let account_id: AccountId = parse_field("account_id", account_id)?;
        let position = Position::new(
            parse_field("x", x)?,
            parse_field("y", y)?,
            parse_field("z", z)?,
        );

        ctx.store_call(
            "update_last_position",
            ctx.store().update_last_position(account_id, position),
        )
        .await?;
        debug!("💓 Account {} at {:?}", account_id, position);
        Ok(Reply::Nothing)
    }
}
