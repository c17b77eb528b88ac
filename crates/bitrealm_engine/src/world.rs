//! World content catalog
//!
//! Handles:
//! - Static world content types (monsters, levels, regions, residents, items, spells)
//! - The one-shot snapshot the document store hands over at startup
//! - Concurrent lookup tables keyed by natural id
//! - Monster pool resolution for battle creation

use crate::profile::Stats;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Content Types
// ============================================================================

/// A monster template. Battles snapshot these by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub mob_id: String,
    pub monster_type: String,
    pub gold_gain: f64,
    pub experience_gain: f64,
    /// Combat profile and stats, passed through to the client untouched
    #[serde(default)]
    pub mob_vitals: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub level_id: String,
    pub level_name: String,
    /// Archive name of the level's scene assets
    pub zip: String,
    /// Monster ids that may spawn here
    #[serde(default)]
    pub monsters: Vec<String>,
    /// Resident npc ids
    #[serde(default)]
    pub residents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub region_id: String,
    pub region_name: String,
    #[serde(default)]
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    pub npc_id: String,
    pub npc_name: String,
    #[serde(default)]
    pub dialogue: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    pub item_type: String,
    #[serde(default)]
    pub item_subtype: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Bonus granted while the item is equipped
    #[serde(default)]
    pub stats: Stats,
    pub base_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub spell_id: String,
    pub name: String,
    pub mana_cost: i32,
    #[serde(default)]
    pub spell_type: String,
    pub element: String,
    pub damage: i32,
}

/// A level together with its resident npcs, as sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub level: Level,
    pub residents: Vec<Resident>,
}

/// A region together with one of its levels, as sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionData {
    pub region: Region,
    pub level_data: LevelData,
}

/// Everything the document store returns from its startup load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub spells: Vec<Spell>,
    #[serde(default)]
    pub monsters: Vec<Monster>,
    #[serde(default)]
    pub levels: Vec<Level>,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub residents: Vec<Resident>,
}

// ============================================================================
// Catalog
// ============================================================================

/// In-memory world content shared by every connection.
///
/// Populated once at startup; afterwards only read.
#[derive(Debug, Default)]
pub struct WorldCatalog {
    items: DashMap<String, Item>,
    spells: DashMap<String, Spell>,
    monsters: DashMap<String, Monster>,
    levels: DashMap<String, Level>,
    regions: DashMap<String, Region>,
    residents: DashMap<String, Resident>,
}

impl WorldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a store snapshot.
    pub fn from_snapshot(snapshot: WorldSnapshot) -> Self {
        let catalog = Self::new();
        catalog.load(snapshot);
        catalog
    }

    /// Inserts every entry of `snapshot`, replacing entries with the same id.
    pub fn load(&self, snapshot: WorldSnapshot) {
        for item in snapshot.items {
            self.items.insert(item.item_id.clone(), item);
        }
        for spell in snapshot.spells {
            self.spells.insert(spell.spell_id.clone(), spell);
        }
        for monster in snapshot.monsters {
            self.monsters.insert(monster.mob_id.clone(), monster);
        }
        for level in snapshot.levels {
            self.levels.insert(level.level_id.clone(), level);
        }
        for region in snapshot.regions {
            self.regions.insert(region.region_id.clone(), region);
        }
        for resident in snapshot.residents {
            self.residents.insert(resident.npc_id.clone(), resident);
        }

        info!(
            "🗺️ World catalog loaded: {} items, {} spells, {} monsters, {} levels, {} regions, {} residents",
            self.items.len(),
            self.spells.len(),
            self.monsters.len(),
            self.levels.len(),
            self.regions.len(),
            self.residents.len()
        );
    }

    pub fn item(&self, item_id: &str) -> Option<Item> {
        self.items.get(item_id).map(|entry| entry.clone())
    }

    pub fn spell(&self, spell_id: &str) -> Option<Spell> {
        self.spells.get(spell_id).map(|entry| entry.clone())
    }

    pub fn monster(&self, mob_id: &str) -> Option<Monster> {
        self.monsters.get(mob_id).map(|entry| entry.clone())
    }

    pub fn level(&self, level_id: &str) -> Option<Level> {
        self.levels.get(level_id).map(|entry| entry.clone())
    }

    pub fn region(&self, region_id: &str) -> Option<Region> {
        self.regions.get(region_id).map(|entry| entry.clone())
    }

    pub fn resident(&self, npc_id: &str) -> Option<Resident> {
        self.residents.get(npc_id).map(|entry| entry.clone())
    }

    /// Resolves the monster ids listed by a level.
    ///
    /// Returns `None` if the level is unknown. Ids that name no monster are
    /// skipped with a warning, so the pool may come back empty.
    pub fn monster_pool(&self, level_id: &str) -> Option<Vec<Monster>> {
        let level = self.levels.get(level_id)?;
        Some(
            level
                .monsters
                .iter()
                .filter_map(|mob_id| {
                    let monster = self.monster(mob_id);
                    if monster.is_none() {
                        warn!("⚠️ Level {} lists unknown monster {}", level_id, mob_id);
                    }
                    monster
                })
                .collect(),
        )
    }

    /// A level with its residents resolved.
    pub fn level_data(&self, level_id: &str) -> Option<LevelData> {
        let level = self.level(level_id)?;
        let residents = level
            .residents
            .iter()
            .filter_map(|npc_id| self.resident(npc_id))
            .collect();
        Some(LevelData { level, residents })
    }

    /// A region with one of its levels resolved.
    pub fn region_data(&self, region_id: &str, level_id: &str) -> Option<RegionData> {
        Some(RegionData {
            region: self.region(region_id)?,
            level_data: self.level_data(level_id)?,
        })
    }

    pub fn monster_count(&self) -> usize {
        self.monsters.len()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn monster(mob_id: &str, gold_gain: f64, experience_gain: f64) -> Monster {
        Monster {
            mob_id: mob_id.to_string(),
            monster_type: "Slime".to_string(),
            gold_gain,
            experience_gain,
            mob_vitals: serde_json::Value::Null,
        }
    }

    pub(crate) fn sample_snapshot() -> WorldSnapshot {
        WorldSnapshot {
            monsters: vec![monster("M1", 5.0, 30.0), monster("M2", 8.0, 45.0)],
            levels: vec![
                Level {
                    level_id: "00001".to_string(),
                    level_name: "Meadow".to_string(),
                    zip: "meadow.zip".to_string(),
                    monsters: vec!["M1".to_string(), "M2".to_string()],
                    residents: vec!["N1".to_string()],
                },
                Level {
                    level_id: "00002".to_string(),
                    level_name: "Empty Hall".to_string(),
                    zip: "hall.zip".to_string(),
                    monsters: vec!["GHOST".to_string()],
                    residents: Vec::new(),
                },
            ],
            regions: vec![Region {
                region_id: "R1".to_string(),
                region_name: "Lowlands".to_string(),
                levels: vec!["00001".to_string(), "00002".to_string()],
            }],
            residents: vec![Resident {
                npc_id: "N1".to_string(),
                npc_name: "Ferris".to_string(),
                dialogue: vec!["Welcome, traveller.".to_string()],
            }],
            items: vec![Item {
                item_id: "WizardHat".to_string(),
                item_type: "head".to_string(),
                item_subtype: "cloth".to_string(),
                name: "Wizard Hat".to_string(),
                description: String::new(),
                stats: Stats {
                    intelligence: 2.0,
                    mana: 10.0,
                    ..Stats::default()
                },
                base_value: 12.0,
            }],
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

    #[test]
    fn test_item_and_spell_lookup() {
        let catalog = WorldCatalog::from_snapshot(sample_snapshot());
        assert_eq!(catalog.item("WizardHat").unwrap().stats.mana, 10.0);
        assert_eq!(catalog.spell("Fireball").unwrap().damage, 20);
        assert!(catalog.item("Cape").is_none());
        assert!(catalog.spell("Frostbolt").is_none());
    }

    #[test]
    fn test_monster_pool_resolves_ids() {
        let catalog = WorldCatalog::from_snapshot(sample_snapshot());
        let pool = catalog.monster_pool("00001").unwrap();
        let ids: Vec<&str> = pool.iter().map(|m| m.mob_id.as_str()).collect();
        assert_eq!(ids, vec!["M1", "M2"]);
    }

    #[test]
    fn test_monster_pool_skips_unknown_monsters() {
        let catalog = WorldCatalog::from_snapshot(sample_snapshot());
        assert_eq!(catalog.monster_pool("00002"), Some(Vec::new()));
        assert_eq!(catalog.monster_pool("nope"), None);
    }

    #[test]
    fn test_region_data_includes_residents() {
        let catalog = WorldCatalog::from_snapshot(sample_snapshot());
        let data = catalog.region_data("R1", "00001").unwrap();
        assert_eq!(data.region.region_name, "Lowlands");
        assert_eq!(data.level_data.residents.len(), 1);
        assert_eq!(data.level_data.residents[0].npc_name, "Ferris");
        assert!(catalog.region_data("R1", "missing").is_none());
    }

    #[test]
    fn test_snapshot_deserializes_with_missing_tables() {
        let snapshot: WorldSnapshot =
            serde_json::from_str(r#"{"monsters":[{"mob_id":"M9","monster_type":"Bat","gold_gain":1,"experience_gain":2}]}"#)
                .unwrap();
        let catalog = WorldCatalog::from_snapshot(snapshot);
        assert_eq!(catalog.monster_count(), 1);
        assert_eq!(catalog.level_count(), 0);
        assert_eq!(catalog.monster("M9").unwrap().mob_vitals, serde_json::Value::Null);
    }
}
