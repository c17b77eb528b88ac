//! Spell index updates (`SU#`).

use crate::context::ServerContext;
use crate::messaging::{Envelope, HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_protocol::{split_fields, Packet};

pub const LEARN: &str = "SU#";

pub const SPELL_ADDED: &str = "Spell added successfully!";
pub const SPELL_MISSING: &str = "Spell does not exist!";

/// Adds a catalog spell to the player's spell index.
pub struct LearnSpellHandler;

#[async_trait]
impl OpcodeHandler for LearnSpellHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, account_id, spell_id] = split_fields::<3>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;
        let fail = |e: HandlerError| e.for_request(envelope);

        let account_id = envelope
            .account_id
            .ok_or_else(|| fail(HandlerError::NotFound("spell update without account".to_string())))?;

        let content = match ctx.catalog().spell(spell_id.trim()) {
            Some(spell) => {
                ctx.store_call("add_spell", ctx.store().add_spell(account_id, &spell))
                    .await
                    .map_err(|e| fail(e.into()))?;
                SPELL_ADDED
            }
            None => SPELL_MISSING,
        };

        Ok(envelope.reply(Packet::simple(
            envelope.request_id,
            LEARN,
            "SPELL",
            content,
        )))
    }
}
