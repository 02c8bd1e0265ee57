//! Offline catch-up.
//!
//! Replays the tick engine over the time the game was closed, in bounded
//! chunks. Deltas are summed chunk by chunk rather than derived from a
//! before/after diff, since runs may start, finish and restart several times
//! inside one offline window.

use super::clock::now_ms;
use super::constants::{DUNGEON_OFFLINE_MAX_MS, DUNGEON_OFFLINE_TICK_MS};
use super::game_state::GameState;
use super::tick::{game_tick_with_delta, TickResult};
use crate::character::{CombatSkill, PlayerId};
use crate::dungeon::{DungeonRegistry, JournalEntry};
use crate::inventory::ItemDelta;
use std::collections::BTreeMap;

/// Report of an offline catch-up.
#[derive(Debug, Clone, Default)]
pub struct OfflineReport {
    /// Real time since the last tick.
    pub elapsed_ms: i64,
    /// Time actually simulated, at most [`DUNGEON_OFFLINE_MAX_MS`].
    pub processed_ms: i64,
    /// True when `elapsed_ms` exceeded the cap.
    pub capped: bool,
    /// Number of simulated chunks.
    pub chunks: u32,
    pub item_delta: ItemDelta,
    pub combat_xp_by_player: BTreeMap<PlayerId, BTreeMap<CombatSkill, u64>>,
    pub combat_ms_by_player: BTreeMap<PlayerId, i64>,
    pub journal: Vec<JournalEntry>,
}

impl OfflineReport {
    fn absorb(&mut self, tick: &TickResult) {
        self.item_delta.merge(&tick.item_delta);
        for (player_id, skills) in &tick.combat_xp_by_player {
            let entry = self.combat_xp_by_player.entry(player_id.clone()).or_default();
            for (skill, xp) in skills {
                *entry.entry(*skill).or_insert(0) += xp;
            }
        }
        for (player_id, ms) in &tick.combat_ms_by_player {
            *self.combat_ms_by_player.entry(player_id.clone()).or_insert(0) += ms;
        }
        self.journal.extend(tick.journal.iter().cloned());
    }

    pub fn total_combat_xp(&self) -> u64 {
        self.combat_xp_by_player
            .values()
            .flat_map(|skills| skills.values())
            .sum()
    }
}

/// Fast-forwards `state` from its `last_tick` to `now_ms`.
///
/// The simulated span is clamped to [`DUNGEON_OFFLINE_MAX_MS`] and run in
/// chunks of at most [`DUNGEON_OFFLINE_TICK_MS`]. When the span was capped a
/// final zero-delta tick is issued at `now_ms` so `last_tick` still reflects
/// real time.
pub fn process_offline_catch_up(
    state: &GameState,
    now_ms: i64,
    registry: &DungeonRegistry,
) -> (GameState, OfflineReport) {
    let elapsed_ms = now_ms - state.last_tick;
    let mut report = OfflineReport {
        elapsed_ms,
        ..OfflineReport::default()
    };
    if elapsed_ms <= 0 {
        return (state.clone(), report);
    }

    report.processed_ms = elapsed_ms.min(DUNGEON_OFFLINE_MAX_MS);
    report.capped = elapsed_ms > DUNGEON_OFFLINE_MAX_MS;

    let start = state.last_tick;
    let end = start + report.processed_ms;
    let mut current = state.clone();
    let mut cursor = start;
    while cursor < end {
        let chunk = (end - cursor).min(DUNGEON_OFFLINE_TICK_MS);
        cursor += chunk;
        let tick = game_tick_with_delta(&current, chunk, cursor, registry);
        report.absorb(&tick);
        report.chunks += 1;
        current = tick.state;
    }

    if report.capped {
        let tick = game_tick_with_delta(&current, 0, now_ms, registry);
        report.absorb(&tick);
        current = tick.state;
    }

    log::info!(
        "offline catch-up: {} ms simulated of {} ms in {} chunks{}",
        report.processed_ms,
        report.elapsed_ms,
        report.chunks,
        if report.capped { " (capped)" } else { "" }
    );
    (current, report)
}

/// Catch-up against the real clock, for use when a save is loaded.
pub fn catch_up_to_now(state: &GameState, registry: &DungeonRegistry) -> (GameState, OfflineReport) {
    process_offline_catch_up(state, now_ms(), registry)
}
