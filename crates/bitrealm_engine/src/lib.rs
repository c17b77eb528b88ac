//! # Bitrealm Engine
//!
//! Game state that outlives a single request: ephemeral battle sessions, the
//! leveling curve, the world content catalog, and the [`DocumentStore`] seam
//! to persistent player data.
//!
//! Nothing in this crate touches the network. The server crate drives these
//! components from its opcode handlers.

pub mod battle;
pub mod error;
pub mod leveling;
pub mod profile;
pub mod store;
pub mod world;

pub use battle::{BattleSession, BattleStatus, BattleTable, Reward};
pub use error::{BattleError, StoreError};
pub use leveling::{apply_experience, is_valid_streamed, PlayerProgress};
pub use profile::{Inventory, Loadout, Position, Profile, Purse, Stats, EMPTY_SLOT};
pub use store::{bounded, DocumentStore, LoginOutcome, MemoryStore};
pub use world::{
    Item, Level, LevelData, Monster, Region, RegionData, Resident, Spell, WorldCatalog,
    WorldSnapshot,
};
