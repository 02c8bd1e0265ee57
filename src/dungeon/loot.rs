//! Weighted dungeon reward tables.
//!
//! Tables are validated once when the registry is built. Rolling is pure: the
//! same seed always yields the same item and quantity.

use crate::core::rng::{hash_seed, seeded_range, seeded_unit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rewards granted per dungeon clear. Only single-reward tables are supported.
pub const REWARDS_PER_CLEAR: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: String,
    pub weight: f64,
    pub quantity_min: u32,
    pub quantity_max: u32,
}

impl LootEntry {
    pub fn new(item_id: &str, weight: f64, quantity_min: u32, quantity_max: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            weight,
            quantity_min,
            quantity_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    pub rewards_per_clear: u32,
    pub entries: Vec<LootEntry>,
}

impl LootTable {
    pub fn new(entries: Vec<LootEntry>) -> Self {
        Self {
            rewards_per_clear: REWARDS_PER_CLEAR,
            entries,
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }
}

/// One rolled reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootReward {
    pub item_id: String,
    pub quantity: u32,
}

/// Content-authoring errors in a loot table. Fatal at load time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LootTableError {
    #[error("dungeon {dungeon_id}: loot table has no entries")]
    Empty { dungeon_id: String },
    #[error("dungeon {dungeon_id}: rewards_per_clear must be 1, found {found}")]
    RewardsPerClear { dungeon_id: String, found: u32 },
    #[error("dungeon {dungeon_id}: entry {item_id} has invalid weight {weight}")]
    InvalidWeight {
        dungeon_id: String,
        item_id: String,
        weight: f64,
    },
    #[error("dungeon {dungeon_id}: entry {item_id} has invalid quantity range {min}..={max}")]
    InvalidQuantity {
        dungeon_id: String,
        item_id: String,
        min: u32,
        max: u32,
    },
    #[error("dungeon {dungeon_id}: entry has an empty item id")]
    MissingItemId { dungeon_id: String },
}

pub fn validate_loot_table(dungeon_id: &str, table: &LootTable) -> Result<(), LootTableError> {
    if table.rewards_per_clear != REWARDS_PER_CLEAR {
        return Err(LootTableError::RewardsPerClear {
            dungeon_id: dungeon_id.to_string(),
            found: table.rewards_per_clear,
        });
    }
    if table.entries.is_empty() {
        return Err(LootTableError::Empty {
            dungeon_id: dungeon_id.to_string(),
        });
    }
    for entry in &table.entries {
        if entry.item_id.trim().is_empty() {
            return Err(LootTableError::MissingItemId {
                dungeon_id: dungeon_id.to_string(),
            });
        }
        if !entry.weight.is_finite() || entry.weight <= 0.0 {
            return Err(LootTableError::InvalidWeight {
                dungeon_id: dungeon_id.to_string(),
                item_id: entry.item_id.clone(),
                weight: entry.weight,
            });
        }
        if entry.quantity_min == 0 || entry.quantity_max < entry.quantity_min {
            return Err(LootTableError::InvalidQuantity {
                dungeon_id: dungeon_id.to_string(),
                item_id: entry.item_id.clone(),
                min: entry.quantity_min,
                max: entry.quantity_max,
            });
        }
    }
    Ok(())
}

/// Rolls one weighted reward.
///
/// The item is picked by walking the entries with a cursor scaled by the
/// total weight; the last entry absorbs float rounding. The quantity comes
/// from an independent seed derived from `seed:item_id:quantity`.
/// Returns `None` only for an empty table, which validation rules out.
pub fn roll_dungeon_loot_reward(table: &LootTable, seed: u64) -> Option<LootReward> {
    let last = table.entries.last()?;
    let mut cursor = seeded_unit(seed) * table.total_weight();
    let mut picked = last;
    for entry in &table.entries {
        if cursor < entry.weight {
            picked = entry;
            break;
        }
        cursor -= entry.weight;
    }

    let quantity_seed = hash_seed(&format!("{}:{}:quantity", seed, picked.item_id));
    let quantity = seeded_range(quantity_seed, picked.quantity_min, picked.quantity_max);
    Some(LootReward {
        item_id: picked.item_id.clone(),
        quantity,
    })
}
