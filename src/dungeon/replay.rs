//! Capped run event log and the immutable replay built from it.
//!
//! Critical events (floor/boss starts, heals, deaths, run end) are always
//! kept. Cosmetic events (attacks, damage numbers, spawns) are subject to a
//! per-step cap and a lifetime cap; overflow is counted, never raised.

use super::types::{DungeonRunState, RunEndReason, RunStatus};
use super::loot::LootReward;
use crate::character::{PlayerState, WeaponType};
use crate::core::constants::{
    DUNGEON_REPLAY_MAX_BYTES, DUNGEON_REPLAY_MAX_EVENTS, DUNGEON_STEP_EVENT_CAP,
    DUNGEON_TOTAL_EVENT_CAP,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEventKind {
    Attack,
    Damage,
    Heal,
    Spawn,
    FloorStart,
    BossStart,
    Death,
    RunEnd,
}

impl ReplayEventKind {
    /// Critical events are exempt from both caps.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            ReplayEventKind::FloorStart
                | ReplayEventKind::BossStart
                | ReplayEventKind::Heal
                | ReplayEventKind::Death
                | ReplayEventKind::RunEnd
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEvent {
    /// Run-relative timestamp.
    pub at_ms: i64,
    pub kind: ReplayEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ReplayEvent {
    pub fn new(at_ms: i64, kind: ReplayEventKind) -> Self {
        Self {
            at_ms,
            kind,
            source_id: None,
            target_id: None,
            amount: None,
            label: None,
        }
    }

    pub fn source(mut self, id: &str) -> Self {
        self.source_id = Some(id.to_string());
        self
    }

    pub fn target(mut self, id: &str) -> Self {
        self.target_id = Some(id.to_string());
        self
    }

    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Appends an event unless a cap rejects it. Returns whether it was kept.
pub fn push_event(run: &mut DungeonRunState, event: ReplayEvent) -> bool {
    if event.kind.is_critical() {
        run.events.push(event);
        return true;
    }
    if run.non_critical_event_count >= DUNGEON_TOTAL_EVENT_CAP
        || run.step_event_count >= DUNGEON_STEP_EVENT_CAP
    {
        run.truncated_events += 1;
        return false;
    }
    run.non_critical_event_count += 1;
    run.step_event_count += 1;
    run.events.push(event);
    true
}

/// Hero as they looked when the replay was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberSnapshot {
    pub player_id: String,
    pub name: String,
    pub weapon_type: WeaponType,
    #[serde(default)]
    pub equipment: BTreeMap<String, String>,
}

/// Finalized, read-only record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonReplayState {
    pub run_id: String,
    pub dungeon_id: String,
    pub run_index: u32,
    pub status: RunStatus,
    pub end_reason: Option<RunEndReason>,
    pub started_at: i64,
    pub ended_at: i64,
    pub elapsed_ms: i64,
    pub floor: u32,
    pub floor_count: u32,
    pub team: Vec<TeamMemberSnapshot>,
    #[serde(default)]
    pub starting_inventory: BTreeMap<String, i64>,
    pub events: Vec<ReplayEvent>,
    /// True when any event was dropped, either during the run or here.
    pub truncated: bool,
    #[serde(default)]
    pub truncated_events: u32,
    #[serde(default)]
    pub fallback_critical_only: bool,
    #[serde(default)]
    pub threat_by_hero_id: BTreeMap<String, f64>,
    #[serde(default)]
    pub loot: Option<LootReward>,
}

fn serialized_len(events: &[ReplayEvent]) -> usize {
    serde_json::to_vec(events)
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX)
}

/// Keeps every critical event and as many of the earliest cosmetic events as
/// fit in `max_events`, preserving order.
fn truncate_events(events: &[ReplayEvent], max_events: usize) -> Vec<ReplayEvent> {
    if events.len() <= max_events {
        return events.to_vec();
    }
    let critical = events.iter().filter(|e| e.kind.is_critical()).count();
    let mut cosmetic_budget = max_events.saturating_sub(critical);
    events
        .iter()
        .filter(|e| {
            if e.kind.is_critical() {
                true
            } else if cosmetic_budget > 0 {
                cosmetic_budget -= 1;
                true
            } else {
                false
            }
        })
        .cloned()
        .collect()
}

/// Bounds an event list by count, then by serialized size. Returns the events
/// and whether the critical-only fallback was used.
pub fn bound_replay_events(
    events: &[ReplayEvent],
    max_events: usize,
    max_bytes: usize,
) -> (Vec<ReplayEvent>, bool) {
    let bounded = truncate_events(events, max_events);
    if serialized_len(&bounded) <= max_bytes {
        return (bounded, false);
    }
    let critical_only = bounded
        .into_iter()
        .filter(|e| e.kind.is_critical())
        .collect();
    (critical_only, true)
}

/// Builds the replay for a run that just ended (or just won).
pub fn build_replay(
    run: &DungeonRunState,
    players: &BTreeMap<String, PlayerState>,
    ended_at: i64,
) -> DungeonReplayState {
    let (events, fallback_critical_only) =
        bound_replay_events(&run.events, DUNGEON_REPLAY_MAX_EVENTS, DUNGEON_REPLAY_MAX_BYTES);
    let truncated = run.truncated_events > 0 || events.len() < run.events.len();

    let team = run
        .party
        .iter()
        .map(|hero| TeamMemberSnapshot {
            player_id: hero.player_id.clone(),
            name: hero.name.clone(),
            weapon_type: hero.weapon_type,
            equipment: players
                .get(&hero.player_id)
                .map(|p| p.equipment.slots.clone())
                .unwrap_or_default(),
        })
        .collect();

    DungeonReplayState {
        run_id: run.id.clone(),
        dungeon_id: run.dungeon_id.clone(),
        run_index: run.run_index,
        status: run.status,
        end_reason: run.end_reason,
        started_at: run.started_at,
        ended_at,
        elapsed_ms: run.elapsed_ms,
        floor: run.floor,
        floor_count: run.floor_count,
        team,
        starting_inventory: run.starting_inventory.clone(),
        events,
        truncated,
        truncated_events: run.truncated_events,
        fallback_critical_only,
        threat_by_hero_id: run.threat_by_hero_id.clone(),
        loot: run.loot.clone(),
    }
}
