//! Player profile documents.

use crate::leveling::PlayerProgress;
use bitrealm_protocol::AccountId;
use serde::{Deserialize, Serialize};

/// Marker stored in a loadout slot that holds nothing.
pub const EMPTY_SLOT: &str = "EMPTY";

/// A position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "pos_x")]
    pub x: f64,
    #[serde(rename = "pos_y")]
    pub y: f64,
    #[serde(rename = "pos_z")]
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Purse {
    pub bits: f64,
}

macro_rules! stat_block {
    ($($field:ident),* $(,)?) => {
        /// Character attributes. Profiles carry the current totals; items
        /// carry the bonus they grant while equipped.
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct Stats {
            $(pub $field: f64,)*
        }

        impl Stats {
            /// Adds `bonus` to every attribute.
            pub fn add(&mut self, bonus: &Stats) {
                $(self.$field += bonus.$field;)*
            }

            /// Removes `bonus` from every attribute.
            pub fn remove(&mut self, bonus: &Stats) {
                $(self.$field -= bonus.$field;)*
            }
        }
    };
}

stat_block!(
    strength,
    intelligence,
    dexterity,
    charisma,
    luck,
    health,
    mana,
    attack,
    magic_attack,
    defense,
    magic_defense,
    armor,
    evasion,
    accuracy,
    agility,
    willpower,
    fire_res,
    water_res,
    earth_res,
    wind_res,
    ice_res,
    energy_res,
    nature_res,
    poison_res,
    metal_res,
    light_res,
    dark_res,
);

/// Equipped item ids, one per slot. Unused slots hold [`EMPTY_SLOT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Loadout {
    pub head: String,
    pub body: String,
    pub feet: String,
    pub weapon: String,
    pub accessory_1: String,
    pub accessory_2: String,
    pub accessory_3: String,
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            head: EMPTY_SLOT.to_string(),
            body: EMPTY_SLOT.to_string(),
            feet: EMPTY_SLOT.to_string(),
            weapon: EMPTY_SLOT.to_string(),
            accessory_1: EMPTY_SLOT.to_string(),
            accessory_2: EMPTY_SLOT.to_string(),
            accessory_3: EMPTY_SLOT.to_string(),
        }
    }
}

impl Loadout {
    /// The slot an item type equips into. Accepts both `head` and the
    /// document path form `loadout.head`.
    pub fn slot_mut(&mut self, item_type: &str) -> Option<&mut String> {
        let slot = item_type.strip_prefix("loadout.").unwrap_or(item_type);
        match slot {
            "head" => Some(&mut self.head),
            "body" => Some(&mut self.body),
            "feet" => Some(&mut self.feet),
            "weapon" => Some(&mut self.weapon),
            "accessory_1" => Some(&mut self.accessory_1),
            "accessory_2" => Some(&mut self.accessory_2),
            "accessory_3" => Some(&mut self.accessory_3),
            _ => None,
        }
    }
}

/// Item ids the player owns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub collection: Vec<String>,
}

/// The profile fields the game server reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "uuid")]
    pub account_id: AccountId,
    pub name: String,
    pub level: i32,
    pub current_exp: f64,
    pub max_exp: f64,
    pub total_exp: f64,
    #[serde(default)]
    pub purse: Purse,
    #[serde(default)]
    pub last_position: Position,
    #[serde(default)]
    pub last_region: String,
    #[serde(default)]
    pub last_level: String,
    #[serde(default)]
    pub items: Inventory,
    #[serde(default)]
    pub loadout: Loadout,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub spell_index: Vec<String>,
}

impl Profile {
    /// A fresh level one profile.
    pub fn new(account_id: AccountId, name: impl Into<String>) -> Self {
        Self {
            account_id,
            name: name.into(),
            level: 1,
            current_exp: 0.0,
            max_exp: 100.0,
            total_exp: 0.0,
            purse: Purse::default(),
            last_position: Position::default(),
            last_region: String::new(),
            last_level: String::new(),
            items: Inventory::default(),
            loadout: Loadout::default(),
            stats: Stats::default(),
            spell_index: Vec::new(),
        }
    }

    pub fn progress(&self) -> PlayerProgress {
        PlayerProgress {
            level: self.level,
            current_exp: self.current_exp,
            max_exp: self.max_exp,
            total_exp: self.total_exp,
        }
    }

    pub fn set_progress(&mut self, progress: PlayerProgress) {
        self.level = progress.level;
        self.current_exp = progress.current_exp;
        self.max_exp = progress.max_exp;
        self.total_exp = progress.total_exp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_uses_document_field_names() {
        let profile = Profile::new(AccountId::new(), "ayla");
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["uuid"], profile.account_id.to_string());
        assert_eq!(json["last_position"]["pos_y"], 0.0);
        assert_eq!(json["purse"]["bits"], 0.0);
        assert_eq!(json["loadout"]["head"], EMPTY_SLOT);
        assert_eq!(json["stats"]["magicAttack"], 0.0);
        assert_eq!(json["items"]["collection"], serde_json::json!([]));
    }

    #[test]
    fn test_progress_round_trip() {
        let mut profile = Profile::new(AccountId::new(), "ayla");
        let mut progress = profile.progress();
        progress.level = 4;
        progress.total_exp = 900.0;
        profile.set_progress(progress);

        assert_eq!(profile.level, 4);
        assert_eq!(profile.total_exp, 900.0);
    }

    #[test]
    fn test_stats_add_and_remove() {
        let bonus = Stats {
            armor: 3.0,
            fire_res: 0.5,
            ..Stats::default()
        };
        let mut stats = Stats {
            armor: 1.0,
            ..Stats::default()
        };

        stats.add(&bonus);
        assert_eq!(stats.armor, 4.0);
        assert_eq!(stats.fire_res, 0.5);

        stats.remove(&bonus);
        assert_eq!(stats, Stats { armor: 1.0, ..Stats::default() });
    }

    #[test]
    fn test_loadout_slots() {
        let mut loadout = Loadout::default();
        *loadout.slot_mut("head").unwrap() = "WizardHat".to_string();
        *loadout.slot_mut("loadout.weapon").unwrap() = "Staff".to_string();

        assert_eq!(loadout.head, "WizardHat");
        assert_eq!(loadout.weapon, "Staff");
        assert!(loadout.slot_mut("tail").is_none());
    }

    #[test]
    fn test_stats_tolerate_missing_fields() {
        let stats: Stats = serde_json::from_str(r#"{"strength": 2, "darkRes": 1}"#).unwrap();
        assert_eq!(stats.strength, 2.0);
        assert_eq!(stats.dark_res, 1.0);
        assert_eq!(stats.luck, 0.0);
    }
}
