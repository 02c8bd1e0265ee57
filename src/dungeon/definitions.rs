//! Static dungeon definitions and the read-only registry the engine reads them from.

use super::loot::{validate_loot_table, LootEntry, LootTable, LootTableError};
use crate::core::constants::{FOOD_ITEM_ID, GOLD_ITEM_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Boss special behaviour, one per dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossMechanic {
    /// Every few attacks hits much harder and stuns the target.
    Burst,
    /// Hits harder once below an HP threshold.
    Enrage,
    /// Periodically damages the whole party.
    Poison,
    /// Periodically calls in extra mobs.
    Summon,
    /// Periodically raises a damage-reduction shield.
    Shield,
}

impl BossMechanic {
    pub fn label(&self) -> &'static str {
        match self {
            BossMechanic::Burst => "burst",
            BossMechanic::Enrage => "enrage",
            BossMechanic::Poison => "poison",
            BossMechanic::Summon => "summon",
            BossMechanic::Shield => "shield",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonDefinition {
    pub id: String,
    pub name: String,
    pub tier: u32,
    pub floor_count: u32,
    pub recommended_power: u32,
    pub boss_name: String,
    pub boss_mechanic: BossMechanic,
    /// Trash mob names; picked by seed when a wave spawns.
    pub mob_names: Vec<String>,
    pub loot_table: LootTable,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Loot(#[from] LootTableError),
    #[error("duplicate dungeon id {0}")]
    DuplicateDungeon(String),
    #[error("dungeon {0} must have at least one floor")]
    NoFloors(String),
    #[error("dungeon {0} must have at least one mob name")]
    NoMobNames(String),
}

/// Read-only lookup tables handed to the engine: dungeons by id and
/// display names by item id.
#[derive(Debug, Clone, Default)]
pub struct DungeonRegistry {
    dungeons: BTreeMap<String, DungeonDefinition>,
    item_names: BTreeMap<String, String>,
}

impl DungeonRegistry {
    /// Validates every definition. Any malformed loot table is a content bug
    /// and aborts registry construction.
    pub fn new(
        definitions: Vec<DungeonDefinition>,
        item_names: BTreeMap<String, String>,
    ) -> Result<Self, RegistryError> {
        let mut dungeons = BTreeMap::new();
        for def in definitions {
            if def.floor_count == 0 {
                return Err(RegistryError::NoFloors(def.id));
            }
            if def.mob_names.is_empty() {
                return Err(RegistryError::NoMobNames(def.id));
            }
            validate_loot_table(&def.id, &def.loot_table)?;
            if dungeons.contains_key(&def.id) {
                return Err(RegistryError::DuplicateDungeon(def.id));
            }
            dungeons.insert(def.id.clone(), def);
        }
        Ok(Self {
            dungeons,
            item_names,
        })
    }

    /// The dungeons shipped with the game.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_dungeons(), builtin_item_names())
    }

    pub fn dungeon(&self, id: &str) -> Option<&DungeonDefinition> {
        self.dungeons.get(id)
    }

    pub fn dungeons(&self) -> impl Iterator<Item = &DungeonDefinition> {
        self.dungeons.values()
    }

    /// Display name for an item, falling back to the id itself.
    pub fn item_name<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.item_names
            .get(item_id)
            .map(String::as_str)
            .unwrap_or(item_id)
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn builtin_dungeons() -> Vec<DungeonDefinition> {
    vec![
        DungeonDefinition {
            id: "goblin_warren".to_string(),
            name: "Goblin Warren".to_string(),
            tier: 1,
            floor_count: 10,
            recommended_power: 40,
            boss_name: "Grubnak the Gnawer".to_string(),
            boss_mechanic: BossMechanic::Burst,
            mob_names: names(&["Goblin Sneak", "Goblin Brute", "Cave Rat", "Goblin Shaman"]),
            loot_table: LootTable::new(vec![
                LootEntry::new("copper_ore", 50.0, 3, 8),
                LootEntry::new("goblin_dagger", 30.0, 1, 1),
                LootEntry::new("potion_minor", 20.0, 2, 4),
            ]),
        },
        DungeonDefinition {
            id: "howling_den".to_string(),
            name: "Howling Den".to_string(),
            tier: 2,
            floor_count: 10,
            recommended_power: 80,
            boss_name: "Old Greymaw".to_string(),
            boss_mechanic: BossMechanic::Enrage,
            mob_names: names(&["Dire Wolf", "Rabid Hound", "Pack Stalker"]),
            loot_table: LootTable::new(vec![
                LootEntry::new("wolf_pelt", 55.0, 2, 6),
                LootEntry::new("fang_necklace", 30.0, 1, 1),
                LootEntry::new("potion", 15.0, 1, 3),
            ]),
        },
        DungeonDefinition {
            id: "sunken_crypt".to_string(),
            name: "Sunken Crypt".to_string(),
            tier: 3,
            floor_count: 12,
            recommended_power: 140,
            boss_name: "The Drowned Abbot".to_string(),
            boss_mechanic: BossMechanic::Poison,
            mob_names: names(&["Bog Skeleton", "Drowned Acolyte", "Crypt Leech"]),
            loot_table: LootTable::new(vec![
                LootEntry::new("grave_dust", 50.0, 3, 7),
                LootEntry::new("abbot_censer", 25.0, 1, 1),
                LootEntry::new("potion", 25.0, 2, 4),
            ]),
        },
        DungeonDefinition {
            id: "hive_depths".to_string(),
            name: "Hive Depths".to_string(),
            tier: 4,
            floor_count: 12,
            recommended_power: 220,
            boss_name: "Brood Queen Sszara".to_string(),
            boss_mechanic: BossMechanic::Summon,
            mob_names: names(&["Hive Drone", "Acid Spitter", "Chitin Guard"]),
            loot_table: LootTable::new(vec![
                LootEntry::new("chitin_plate", 45.0, 2, 5),
                LootEntry::new("royal_jelly", 35.0, 1, 3),
                LootEntry::new("potion_major", 20.0, 1, 2),
            ]),
        },
        DungeonDefinition {
            id: "ember_forge".to_string(),
            name: "Ember Forge".to_string(),
            tier: 5,
            floor_count: 15,
            recommended_power: 320,
            boss_name: "Forgemaster Vell".to_string(),
            boss_mechanic: BossMechanic::Shield,
            mob_names: names(&["Cinder Imp", "Slag Golem", "Forge Warden"]),
            loot_table: LootTable::new(vec![
                LootEntry::new("ember_ingot", 50.0, 2, 4),
                LootEntry::new("vell_hammer", 15.0, 1, 1),
                LootEntry::new("potion_major", 35.0, 1, 3),
            ]),
        },
    ]
}

fn builtin_item_names() -> BTreeMap<String, String> {
    [
        (FOOD_ITEM_ID, "Food"),
        (GOLD_ITEM_ID, "Gold"),
        ("potion_minor", "Minor Potion"),
        ("potion", "Potion"),
        ("potion_major", "Major Potion"),
        ("copper_ore", "Copper Ore"),
        ("goblin_dagger", "Goblin Dagger"),
        ("wolf_pelt", "Wolf Pelt"),
        ("fang_necklace", "Fang Necklace"),
        ("grave_dust", "Grave Dust"),
        ("abbot_censer", "Abbot's Censer"),
        ("chitin_plate", "Chitin Plate"),
        ("royal_jelly", "Royal Jelly"),
        ("ember_ingot", "Ember Ingot"),
        ("vell_hammer", "Vell's Hammer"),
    ]
    .into_iter()
    .map(|(id, name)| (id.to_string(), name.to_string()))
    .collect()
}
