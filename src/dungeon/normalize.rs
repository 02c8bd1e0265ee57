//! Load-boundary repair of persisted dungeon state.
//!
//! Saves written by older versions can miss cooldown fields, threat maps or
//! cadence snapshots, and can hold stale target ids. Everything is repaired
//! here so the engine itself never has to second-guess its input.

use super::lifecycle::{build_cadence, refresh_active_run_id, refresh_hero_stats};
use super::threat::build_threat_tie_order;
use super::types::{DungeonRunState, DungeonState};
use crate::character::PlayerState;
use crate::core::constants::{DUNGEON_SIMULATION_STEP_MS, HERO_BASE_ATTACK_MS};
use crate::core::game_state::GameState;
use std::collections::{BTreeMap, BTreeSet};

pub fn normalize_game_state(state: &mut GameState) -> u32 {
    normalize_dungeon_state(&mut state.dungeon, &state.players)
}

/// Repairs the whole dungeon aggregate. Returns the number of fixes applied.
pub fn normalize_dungeon_state(
    dungeon: &mut DungeonState,
    players: &BTreeMap<String, PlayerState>,
) -> u32 {
    let mut repairs = 0;

    let policy = &mut dungeon.policy;
    if policy.max_supported_concurrent_runs == 0 {
        policy.max_supported_concurrent_runs = 1;
        repairs += 1;
    }
    if policy.max_enabled_concurrent_runs == 0
        || policy.max_enabled_concurrent_runs > policy.max_supported_concurrent_runs
    {
        policy.max_enabled_concurrent_runs = policy.max_enabled_concurrent_runs.clamp(
            1,
            policy.max_supported_concurrent_runs,
        );
        repairs += 1;
    }

    let mut seen = BTreeSet::new();
    let before = dungeon.setup.selected_hero_ids.len();
    dungeon
        .setup
        .selected_hero_ids
        .retain(|id| players.contains_key(id) && seen.insert(id.clone()));
    if dungeon.setup.selected_hero_ids.len() != before {
        repairs += 1;
    }

    for (key, run) in dungeon.runs.iter_mut() {
        if run.id != *key {
            run.id = key.clone();
            repairs += 1;
        }
        repairs += ensure_run_bookkeeping(run, players);
    }

    let previous = dungeon.active_run_id.clone();
    refresh_active_run_id(dungeon);
    if dungeon.active_run_id != previous {
        repairs += 1;
    }

    if repairs > 0 {
        log::warn!("repaired {} malformed dungeon fields on load", repairs);
    }
    repairs
}

/// Brings one run's bookkeeping into a shape the engine can step.
///
/// Cheap when nothing is wrong; the tick engine calls it once per run per
/// invocation. Returns the number of fixes applied.
pub fn ensure_run_bookkeeping(
    run: &mut DungeonRunState,
    players: &BTreeMap<String, PlayerState>,
) -> u32 {
    let mut repairs = 0;
    let floor_cooldown = -DUNGEON_SIMULATION_STEP_MS;

    if run.floor_count == 0 {
        run.floor_count = 1;
        repairs += 1;
    }
    if run.floor == 0 || run.floor > run.floor_count {
        run.floor = run.floor.clamp(1, run.floor_count);
        repairs += 1;
    }
    if run.tier == 0 {
        run.tier = 1;
        repairs += 1;
    }
    if run.step_carry_ms < 0 || run.step_carry_ms >= DUNGEON_SIMULATION_STEP_MS {
        run.step_carry_ms = run.step_carry_ms.rem_euclid(DUNGEON_SIMULATION_STEP_MS);
        repairs += 1;
    }
    if run.floor_pause_ms < 0 {
        run.floor_pause_ms = 0;
        repairs += 1;
    }

    for hero in run.party.iter_mut() {
        if hero.hp_max <= 0 || hero.attack_interval_ms <= 0 {
            match players.get(&hero.player_id) {
                Some(player) => refresh_hero_stats(hero, player),
                None => {
                    hero.hp_max = hero.hp_max.max(1);
                    if hero.attack_interval_ms <= 0 {
                        hero.attack_interval_ms = HERO_BASE_ATTACK_MS as i64;
                    }
                }
            }
            repairs += 1;
        }
        if hero.hp < 0 || hero.hp > hero.hp_max {
            hero.hp = hero.hp.clamp(0, hero.hp_max);
            repairs += 1;
        }
        if hero.attack_damage <= 0 {
            hero.attack_damage = 1;
            repairs += 1;
        }
        for cooldown in [
            &mut hero.attack_cooldown_ms,
            &mut hero.heal_cooldown_ms,
            &mut hero.potion_cooldown_ms,
            &mut hero.taunt_cooldown_ms,
        ] {
            if *cooldown < floor_cooldown {
                *cooldown = floor_cooldown;
                repairs += 1;
            }
        }
        if !hero.taunt_bonus.is_finite() || hero.taunt_bonus < 0.0 {
            hero.clear_taunt();
            repairs += 1;
        }
    }

    for enemy in run.enemies.iter_mut() {
        if enemy.hp_max <= 0 {
            enemy.hp_max = enemy.hp.max(1);
            repairs += 1;
        }
        if enemy.hp < 0 || enemy.hp > enemy.hp_max {
            enemy.hp = enemy.hp.clamp(0, enemy.hp_max);
            repairs += 1;
        }
        if enemy.attack_interval_ms <= 0 {
            enemy.attack_interval_ms = DUNGEON_SIMULATION_STEP_MS;
            repairs += 1;
        }
        if enemy.attack_cooldown_ms < floor_cooldown {
            enemy.attack_cooldown_ms = floor_cooldown;
            repairs += 1;
        }
        if enemy.mechanic_cooldown_ms < floor_cooldown {
            enemy.mechanic_cooldown_ms = floor_cooldown;
            repairs += 1;
        }
    }
    if let Some(max_index) = run.enemies.iter().map(|e| e.spawn_index).max() {
        if run.next_spawn_index <= max_index {
            run.next_spawn_index = max_index + 1;
            repairs += 1;
        }
    }

    let hero_ids: Vec<String> = run.party.iter().map(|h| h.player_id.clone()).collect();
    let before = run.threat_by_hero_id.len();
    run.threat_by_hero_id.retain(|id, _| hero_ids.contains(id));
    if run.threat_by_hero_id.len() != before {
        repairs += 1;
    }
    for id in &hero_ids {
        let value = run.threat_by_hero_id.entry(id.clone()).or_insert(f64::NAN);
        if !value.is_finite() || *value < 0.0 {
            *value = 0.0;
            repairs += 1;
        }
    }

    let mut sorted_order = run.threat_tie_order.clone();
    sorted_order.sort();
    let mut sorted_ids = hero_ids.clone();
    sorted_ids.sort();
    if sorted_order != sorted_ids {
        run.threat_tie_order = build_threat_tie_order(run.seed, &hero_ids);
        repairs += 1;
    }

    let hero_target_valid = run
        .target_hero_id
        .as_deref()
        .map_or(true, |id| run.hero(id).is_some_and(|h| h.is_alive()));
    if !hero_target_valid {
        run.target_hero_id = None;
        repairs += 1;
    }
    let enemy_target_valid = run
        .target_enemy_id
        .as_deref()
        .map_or(true, |id| run.enemy(id).is_some_and(|e| e.is_alive()));
    if !enemy_target_valid {
        run.target_enemy_id = None;
        repairs += 1;
    }

    if run.cadence.len() != run.party.len() {
        run.cadence = build_cadence(&run.party, players);
        repairs += 1;
    }
    repairs
}
