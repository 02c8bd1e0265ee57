//! Delve - deterministic dungeon combat for an idle RPG.
//!
//! A fixed-step, replayable party-vs-wave simulator that runs the same way
//! whether it is ticked in real time or fast-forwarded through hours of
//! offline time.

pub mod character;
pub mod core;
pub mod dungeon;
pub mod inventory;
pub mod simulator;

pub use crate::core::{game_tick, process_offline_catch_up, GameState, OfflineReport, TickResult};
pub use crate::dungeon::{apply_dungeon_tick, DungeonRegistry, DungeonTickResult};
