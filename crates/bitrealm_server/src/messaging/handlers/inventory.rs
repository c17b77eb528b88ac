//! Inventory (`IA#`, `IU#`) and loadout (`LE#`, `LUE#`) updates.
//!
//! Items are looked up in the world catalog by id. An id the catalog does
//! not know is answered with the usual negative content rather than an
//! error packet, since the client treats both outcomes as a normal reply.

use crate::context::ServerContext;
use crate::messaging::{Envelope, HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_engine::Item;
use bitrealm_protocol::{split_fields, AccountId, Packet};
use tracing::debug;

pub const ADD: &str = "IA#";
pub const UPDATE: &str = "IU#";
pub const EQUIP: &str = "LE#";
pub const UNEQUIP: &str = "LUE#";

pub const ITEM_ADDED: &str = "Item added successfully!";
pub const ITEM_MISSING: &str = "Item does not exist!";

/// Parsed `requestId?accountId?itemId` request.
struct ItemRequest<'a> {
    envelope: Envelope,
    account_id: AccountId,
    item_id: &'a str,
}

impl<'a> ItemRequest<'a> {
    fn parse(payload: &'a str, opcode: &str) -> Result<Self, HandlerError> {
        let [request_id, account_id, item_id] = split_fields::<3>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;
        let account_id = envelope.account_id.ok_or_else(|| {
            HandlerError::NotFound(format!("{opcode} without account")).for_request(envelope)
        })?;
        Ok(Self {
            envelope,
            account_id,
            item_id: item_id.trim(),
        })
    }

    fn item(&self, ctx: &ServerContext) -> Option<Item> {
        let item = ctx.catalog().item(self.item_id);
        if item.is_none() {
            debug!("Unknown item {} requested by {}", self.item_id, self.account_id);
        }
        item
    }

    fn reply(&self, opcode: &str, service_tag: &str, content: impl Into<String>) -> Reply {
        self.envelope.reply(Packet::simple(
            self.envelope.request_id,
            opcode,
            service_tag,
            content,
        ))
    }
}

/// Adds an item to the player's inventory. Serves both `IA#` and `IU#`,
/// answering with the opcode it was registered under.
pub struct InventoryHandler(pub &'static str);

#[async_trait]
impl OpcodeHandler for InventoryHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let request = ItemRequest::parse(payload, self.0)?;
        let Some(item) = request.item(ctx) else {
            return Ok(request.reply(self.0, "INVENTORY", ITEM_MISSING));
        };

        ctx.store_call(
            "add_inventory_item",
            ctx.store().add_inventory_item(request.account_id, &item),
        )
        .await
        .map_err(|e| HandlerError::from(e).for_request(request.envelope))?;

        Ok(request.reply(self.0, "INVENTORY", ITEM_ADDED))
    }
}

/// Equips an item into the loadout slot named by its type.
pub struct EquipHandler;

#[async_trait]
impl OpcodeHandler for EquipHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let request = ItemRequest::parse(payload, EQUIP)?;
        let equipped = match request.item(ctx) {
            Some(item) => ctx
                .store_call("equip_item", ctx.store().equip_item(request.account_id, &item))
                .await
                .map_err(|e| HandlerError::from(e).for_request(request.envelope))?,
            None => false,
        };

        Ok(request.reply(EQUIP, "LOADOUT", format!("EQUIP${}", u8::from(equipped))))
    }
}

/// Takes an equipped item off.
pub struct UnequipHandler;

#[async_trait]
impl OpcodeHandler for UnequipHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let request = ItemRequest::parse(payload, UNEQUIP)?;
        let removed = match request.item(ctx) {
            Some(item) => ctx
                .store_call(
                    "unequip_item",
                    ctx.store().unequip_item(request.account_id, &item),
                )
                .await
                .map_err(|e| HandlerError::from(e).for_request(request.envelope))?,
            None => false,
        };

        Ok(request.reply(UNEQUIP, "LOADOUT", format!("UNEQUIP${}", u8::from(removed))))
    }
}
