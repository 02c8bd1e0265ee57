//! Party-vs-wave dungeon combat: definitions, run state, lifecycle and the
//! fixed-step engine.

pub mod definitions;
pub mod engine;
pub mod lifecycle;
pub mod loot;
pub mod normalize;
pub mod replay;
pub mod threat;
pub mod types;

pub use definitions::{BossMechanic, DungeonDefinition, DungeonRegistry, RegistryError};
pub use engine::{apply_dungeon_tick, DungeonTickResult};
pub use lifecycle::{
    complete_onboarding, select_dungeon, set_auto_consumables, set_auto_restart, set_party,
    start_dungeon_run, start_dungeon_run_from_setup, stop_dungeon_run, StartRunError,
    StartRunRequest,
};
pub use loot::{roll_dungeon_loot_reward, validate_loot_table, LootEntry, LootReward, LootTable};
pub use replay::{DungeonReplayState, ReplayEvent, ReplayEventKind};
pub use types::*;
