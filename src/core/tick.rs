//! Top-level game tick.
//!
//! Wraps the dungeon engine, keeps `last_tick` in step with real time and
//! returns a [`TickResult`] the outer idle loop and journal can consume
//! without diffing state.

use super::game_state::GameState;
use crate::character::{CombatSkill, PlayerId};
use crate::dungeon::engine::apply_dungeon_tick;
use crate::dungeon::{DungeonRegistry, JournalEntry};
use crate::inventory::ItemDelta;
use std::collections::BTreeMap;

/// Result of processing one game tick.
#[derive(Debug, Clone, Default)]
pub struct TickResult {
    /// State after the tick. The input state is left as it was.
    pub state: GameState,

    /// Milliseconds handed to the simulation.
    pub delta_ms: i64,

    /// Net inventory change produced by the tick.
    pub item_delta: ItemDelta,

    /// Combat XP granted per hero and skill.
    pub combat_xp_by_player: BTreeMap<PlayerId, BTreeMap<CombatSkill, u64>>,

    /// Active combat time per hero.
    pub combat_ms_by_player: BTreeMap<PlayerId, i64>,

    /// Journal lines for runs that ended during the tick.
    pub journal: Vec<JournalEntry>,
}

/// Processes a tick ending at `now_ms`, simulating the time since `last_tick`.
///
/// A clock that went backwards simulates nothing but still moves
/// `last_tick` to `now_ms`.
pub fn game_tick(state: &GameState, now_ms: i64, registry: &DungeonRegistry) -> TickResult {
    let delta_ms = (now_ms - state.last_tick).max(0);
    game_tick_with_delta(state, delta_ms, now_ms, registry)
}

/// Processes a tick with an explicit simulated delta.
///
/// # Arguments
/// - `state` — state before the tick
/// - `delta_ms` — simulated time; negative values are treated as zero
/// - `now_ms` — wall-clock time recorded as `last_tick`
/// - `registry` — dungeon and item lookup tables
pub fn game_tick_with_delta(
    state: &GameState,
    delta_ms: i64,
    now_ms: i64,
    registry: &DungeonRegistry,
) -> TickResult {
    let delta_ms = delta_ms.max(0);
    let dungeon = apply_dungeon_tick(state, delta_ms, registry);
    let mut next = dungeon.state;
    next.last_tick = now_ms;

    TickResult {
        state: next,
        delta_ms,
        item_delta: dungeon.item_delta,
        combat_xp_by_player: dungeon.combat_xp_by_player,
        combat_ms_by_player: dungeon.combat_ms_by_player,
        journal: dungeon.journal,
    }
}
