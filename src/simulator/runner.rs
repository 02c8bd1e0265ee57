//! Simulation runner driving the real tick engine.
//!
//! Each expedition builds a fresh roster, starts one run and feeds it ticks
//! through [`game_tick_with_delta`], exactly as the idle loop would.
//! Statistics are read from tick results and the resulting state.

use super::config::SimConfig;
use super::report::{ExpeditionStats, SimReport};
use crate::character::{AttributeType, Attributes, PlayerState, WeaponType};
use crate::core::constants::{FOOD_ITEM_ID, GOLD_ITEM_ID, POTION_PRIORITY};
use crate::core::game_state::GameState;
use crate::core::tick::{game_tick_with_delta, TickResult};
use crate::dungeon::{
    set_auto_consumables, set_auto_restart, start_dungeon_run, DungeonRegistry, StartRunRequest,
};
use crate::inventory::Inventory;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SAMPLE_ROSTER: [(&str, &str, WeaponType); 4] = [
    ("sim-tank", "Bruna", WeaponType::Melee),
    ("sim-archer", "Ivo", WeaponType::Ranged),
    ("sim-mage", "Selka", WeaponType::Magic),
    ("sim-ranger", "Tamsin", WeaponType::Ranged),
];

/// Run every expedition and return the aggregated report.
pub fn run_simulation(config: &SimConfig, registry: &DungeonRegistry) -> SimReport {
    let mut expeditions = Vec::with_capacity(config.num_runs as usize);

    for run_idx in 0..config.num_runs {
        // The rng only picks the run id; the engine derives every roll from it.
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(run_idx as u64)),
            None => ChaCha8Rng::from_entropy(),
        };

        let stats = simulate_expedition(config, registry, &mut rng);
        if config.verbosity >= 2 {
            println!(
                "Expedition {}/{} - {} victories, max floor {}, ended {}, gold {}, food {}",
                run_idx + 1,
                config.num_runs,
                stats.victories,
                stats.max_floor,
                stats.outcome_label(),
                stats.gold,
                stats.food_spent
            );
        }
        expeditions.push(stats);
    }

    SimReport::from_expeditions(config, expeditions)
}

/// Builds the sample party used by every expedition.
pub fn sample_roster(config: &SimConfig) -> Vec<PlayerState> {
    SAMPLE_ROSTER
        .iter()
        .map(|(id, name, weapon)| {
            let mut player = PlayerState::new(*id, *name);
            let mut attributes = Attributes::new();
            for attr in AttributeType::all() {
                attributes.set(attr, config.hero_attribute);
            }
            player.attributes = attributes;
            player.equipment.weapon_type = *weapon;
            player.equipment.armor = config.hero_armor;
            player.skill_mut(weapon.combat_skill()).level = config.hero_level.max(1);
            player
        })
        .collect()
}

fn starting_state(config: &SimConfig) -> GameState {
    let mut state = GameState::new(0);
    for player in sample_roster(config) {
        state.add_player(player);
    }
    let mut inventory = Inventory::new().with_item(FOOD_ITEM_ID, config.food);
    for (potion_id, _) in POTION_PRIORITY {
        inventory = inventory.with_item(potion_id, config.potions);
    }
    state.inventory = inventory;
    set_auto_restart(&mut state, config.auto_restart);
    set_auto_consumables(&mut state, config.auto_consumables);
    state
}

fn simulate_expedition(
    config: &SimConfig,
    registry: &DungeonRegistry,
    rng: &mut ChaCha8Rng,
) -> ExpeditionStats {
    let run_id = format!("sim-{:016x}", rng.gen::<u64>());
    let mut stats = ExpeditionStats::new(&run_id);
    let mut state = starting_state(config);
    let initial = state.inventory.clone();

    let request = StartRunRequest {
        run_id: run_id.clone(),
        dungeon_id: config.dungeon_id.clone(),
        hero_ids: SAMPLE_ROSTER.iter().map(|(id, _, _)| id.to_string()).collect(),
        now_ms: 0,
    };
    if let Err(err) = start_dungeon_run(&mut state, request, registry) {
        stats.start_error = Some(err.to_string());
        return stats;
    }

    let tick_ms = config.tick_ms.max(1);
    let mut now = 0;
    let mut last_replay_index = None;
    while now < config.duration_ms {
        let chunk = tick_ms.min(config.duration_ms - now);
        now += chunk;
        let tick = game_tick_with_delta(&state, chunk, now, registry);
        record_tick(&mut stats, &tick);
        state = tick.state;

        if let Some(replay) = &state.dungeon.latest_replay {
            if last_replay_index != Some(replay.run_index) {
                last_replay_index = Some(replay.run_index);
                stats.truncated_events += replay.truncated_events;
                if let Some(loot) = &replay.loot {
                    *stats.loot.entry(loot.item_id.clone()).or_insert(0) += loot.quantity as i64;
                }
            }
        }

        let Some(run) = state.dungeon.runs.get(&run_id) else {
            break;
        };
        stats.max_floor = stats.max_floor.max(run.floor);
        if !run.is_active() {
            break;
        }
    }

    stats.simulated_ms = now;
    stats.victories = state.dungeon.completions(&config.dungeon_id);
    if let Some(run) = state.dungeon.runs.get(&run_id) {
        stats.restarts = run.run_index;
        if !run.is_active() {
            stats.end_reason = run.end_reason;
        }
    }
    stats.food_spent = initial.count(FOOD_ITEM_ID) - state.inventory.count(FOOD_ITEM_ID);
    stats.potions_used = POTION_PRIORITY
        .iter()
        .map(|(id, _)| {
            initial.count(id) + stats.loot.get(*id).copied().unwrap_or(0)
                - state.inventory.count(id)
        })
        .sum();
    stats
}

fn record_tick(stats: &mut ExpeditionStats, tick: &TickResult) {
    stats.gold += tick.item_delta.get(GOLD_ITEM_ID);
    stats.combat_xp += tick
        .combat_xp_by_player
        .values()
        .flat_map(|skills| skills.values())
        .sum::<u64>();
    stats.combat_ms += tick.combat_ms_by_player.values().sum::<i64>();
}
