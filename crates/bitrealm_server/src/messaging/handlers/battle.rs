//! Battle request (`BR#`) and battle finish (`BF#`).

use super::to_json;
use crate::context::ServerContext;
use crate::messaging::{Envelope, HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_engine::{Monster, Profile};
use bitrealm_protocol::{parse_field, parse_reward_matrix, split_fields, BattleId, Packet};
use serde::Serialize;
use tracing::{info, warn};

pub const REQUEST: &str = "BR#";
pub const FINISH: &str = "BF#";

/// Content of a battle request reply.
#[derive(Debug, Serialize)]
struct BattleStart<'a> {
    battle_id: BattleId,
    profile: &'a Profile,
    monsters: &'a [Monster],
    monster_quantity: usize,
}

/// Starts a battle on the requested level.
pub struct BattleRequestHandler;

#[async_trait]
impl OpcodeHandler for BattleRequestHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, account_id, level_id] = split_fields::<3>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;

        start_battle(envelope, level_id, ctx)
            .await
            .map_err(|e| e.for_request(envelope))
    }
}

async fn start_battle(
    envelope: Envelope,
    level_id: &str,
    ctx: &ServerContext,
) -> Result<Reply, HandlerError> {
    let account_id = envelope
        .account_id
        .ok_or_else(|| HandlerError::NotFound("battle request without account".to_string()))?;

    let profile = ctx
        .store_call("find_profile", ctx.store().find_profile(account_id))
        .await?;
    let session = ctx.battles().create(
        ctx.catalog(),
        level_id.trim(),
        ctx.config().battle_monster_count,
    )?;

    let content = to_json(&BattleStart {
        battle_id: session.battle_id,
        profile: &profile,
        monsters: &session.participants,
        monster_quantity: session.participants.len(),
    })?;

    Ok(envelope.reply(Packet::chained(
        envelope.request_id,
        REQUEST,
        "BATTLE",
        &content,
    )))
}

/// Resolves a battle and pays out its reward.
///
/// The battle is claimed first so a duplicate finish cannot pay twice. Gold
/// and experience are then granted in one store update, and the resulting
/// total is written back to the battle session. If the store call fails the
/// battle goes back to pending and the client may send the finish again.
/// The reply reads `exp|gold|True|<profile json>`.
pub struct BattleFinishHandler;

#[async_trait]
impl OpcodeHandler for BattleFinishHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, account_id, battle_id, matrix] = split_fields::<4>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;

        finish_battle(envelope, battle_id, matrix, ctx)
            .await
            .map_err(|e| e.for_request(envelope))
    }
}

async fn finish_battle(
    envelope: Envelope,
    battle_id: &str,
    matrix: &str,
    ctx: &ServerContext,
) -> Result<Reply, HandlerError> {
    let account_id = envelope
        .account_id
        .ok_or_else(|| HandlerError::NotFound("battle finish without account".to_string()))?;
    let battle_id: BattleId = parse_field("battle_id", battle_id)?;
    let matrix = parse_reward_matrix(matrix)?;

    let reward = ctx.battles().claim(battle_id, &matrix)?;
    let paid = ctx
        .store_call(
            "grant_reward",
            ctx.store().grant_reward(account_id, reward.gold, reward.exp),
        )
        .await;
    let profile = match paid {
        Ok(profile) => profile,
        Err(e) => {
            ctx.battles().release(battle_id);
            return Err(e.into());
        }
    };
    if let Err(e) = ctx.battles().settle(battle_id, profile.total_exp) {
        warn!("⚠️ Paid out battle {} but could not settle it: {}", battle_id, e);
    }

    info!(
        "🏆 Account {} won battle {}: {} gold, {} exp (level {})",
        account_id, battle_id, reward.gold, reward.exp, profile.level
    );

    let content = format!(
        "{}|{}|True|{}",
        reward.exp,
        reward.gold,
        to_json(&profile)?
    );
    Ok(envelope.reply(Packet::chained(
        envelope.request_id,
        FINISH,
        "BATTLEFINISH",
        &content,
    )))
}
