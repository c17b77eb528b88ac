//! Handlers for each client opcode, grouped by concern.

pub mod battle;
pub mod delivery;
pub mod diagnostics;
pub mod inventory;
pub mod progress;
pub mod session;
pub mod spells;
pub mod world;

use super::HandlerError;
use serde::Serialize;

/// Serializes handler content, mapping failures into the handler error type.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, HandlerError> {
    serde_json::to_string(value)
        .map_err(|e| HandlerError::Protocol(bitrealm_protocol::ProtocolError::Serialization(e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::config::ServerConfig;
    use crate::context::ServerContext;
    use crate::messaging::Reply;
    use bitrealm_engine::{
        Item, Level, MemoryStore, Monster, Region, Resident, Spell, Stats, WorldCatalog,
        WorldSnapshot,
    };
    use bitrealm_protocol::{AccountId, Packet};
    use std::sync::Arc;

    pub(crate) fn monster(mob_id: &str, gold_gain: f64, experience_gain: f64) -> Monster {
        Monster {
            mob_id: mob_id.to_string(),
            monster_type: "Slime".to_string(),
            gold_gain,
            experience_gain,
            mob_vitals: serde_json::Value::Null,
        }
    }

    /// One level with a single monster (5 gold, 30 exp) so battles are
    /// deterministic, one resident, one region, a hat, a robe and a spell.
    pub(crate) fn world() -> WorldSnapshot {
        WorldSnapshot {
            monsters: vec![monster("M1", 5.0, 30.0)],
            levels: vec![Level {
                level_id: "00001".to_string(),
                level_name: "Meadow".to_string(),
                zip: "meadow.zip".to_string(),
                monsters: vec!["M1".to_string()],
                residents: vec!["N1".to_string()],
            }],
            regions: vec![Region {
                region_id: "R1".to_string(),
                region_name: "Lowlands".to_string(),
                levels: vec!["00001".to_string()],
            }],
            residents: vec![Resident {
                npc_id: "N1".to_string(),
                npc_name: "Ferris".to_string(),
                dialogue: vec!["Welcome, traveller.".to_string()],
            }],
            items: vec![item("WizardHat", "head", 2.0), item("WizardRobe", "body", 5.0)],
            spells: vec![Spell {
                spell_id: "Fireball".to_string(),
                name: "Fireball".to_string(),
                mana_cost: 5,
                spell_type: "attack".to_string(),
                element: "fire".to_string(),
                damage: 20,
            }],
        }
    }

    /// An item whose only bonus is `armor`.
    pub(crate) fn item(item_id: &str, item_type: &str, armor: f64) -> Item {
        Item {
            item_id: item_id.to_string(),
            item_type: item_type.to_string(),
            item_subtype: "cloth".to_string(),
            name: item_id.to_string(),
            description: String::new(),
            stats: Stats {
                armor,
                ..Stats::default()
            },
            base_value: 10.0,
        }
    }

    /// A context over an in-memory store holding `world()` and one
    /// registered player (`ada` / `secret`).
    pub(crate) async fn test_context() -> (ServerContext, AccountId) {
        context_with(ServerConfig::default(), MemoryStore::new()).await
    }

    /// Like [`test_context`], over a caller-built store and config.
    pub(crate) async fn context_with(
        config: ServerConfig,
        store: MemoryStore,
    ) -> (ServerContext, AccountId) {
        let store = store.with_world(world());
        let account = store.register("ada", "secret").await;
        let ctx = ServerContext::new(
            config,
            Arc::new(store),
            Arc::new(WorldCatalog::from_snapshot(world())),
        );
        (ctx, account)
    }

    /// Unwraps a cached reply, checking the account it is cached under.
    pub(crate) fn delivered(reply: Reply, account: AccountId) -> Packet {
        match reply {
            Reply::Deliver { account_id, packet } => {
                assert_eq!(account_id, account);
                packet
            }
            other => panic!("expected a cached reply, got {other:?}"),
        }
    }

    /// Strips the `@"` / `"@` markers from chained content and parses it.
    pub(crate) fn chained_json(packet: &Packet) -> serde_json::Value {
        let inner = packet
            .content
            .strip_prefix("@\"")
            .and_then(|rest| rest.strip_suffix("\"@"))
            .expect("chained content markers");
        serde_json::from_str(inner).expect("chained content is json")
    }
}
