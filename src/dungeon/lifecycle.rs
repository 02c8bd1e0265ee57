//! Run creation, floor transitions, finalization and restart.

use super::definitions::{BossMechanic, DungeonDefinition, DungeonRegistry};
use super::replay::{build_replay, push_event, ReplayEvent, ReplayEventKind};
use super::threat::build_threat_tie_order;
use super::types::{
    DungeonRunState, DungeonState, EnemyState, HeroCadence, HeroCombatState, JournalEntry,
    RunEndReason, RunStatus,
};
use crate::character::{AttributeType, PlayerState, WeaponType};
use crate::core::combat_math::{
    food_cost_for_floor, resolve_heal_amount, resolve_hero_attack_damage,
    resolve_hero_attack_interval_ms, resolve_hero_max_hp, resolve_mob_damage, resolve_mob_hp,
};
use crate::core::constants::*;
use crate::core::game_state::GameState;
use crate::core::rng::{seed_from_parts, seeded_rng};
use crate::inventory::{Inventory, ItemDelta};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Why a run could not be started. The game state is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartRunError {
    #[error("unknown dungeon {0}")]
    UnknownDungeon(String),
    #[error("a party needs exactly {expected} heroes, got {found}")]
    WrongPartySize { expected: usize, found: usize },
    #[error("hero {0} is listed more than once")]
    DuplicateHero(String),
    #[error("unknown hero {0}")]
    UnknownHero(String),
    #[error("hero {0} is already in an active run")]
    HeroBusy(String),
    #[error("hero {0} is busy with another action")]
    HeroNotIdle(String),
    #[error("{active} of {limit} concurrent runs already active")]
    TooManyRuns { active: usize, limit: usize },
    #[error("run id {0} is already taken")]
    DuplicateRunId(String),
    #[error("not enough food: floor 1 costs {required}, have {available}")]
    NotEnoughFood { required: i64, available: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRunRequest {
    pub run_id: String,
    pub dungeon_id: String,
    pub hero_ids: Vec<String>,
    pub now_ms: i64,
}

/// Item ids captured in the starting inventory snapshot of a run.
fn tracked_item_ids() -> Vec<&'static str> {
    let mut ids = vec![FOOD_ITEM_ID, GOLD_ITEM_ID];
    ids.extend(POTION_PRIORITY.iter().map(|(id, _)| *id));
    ids
}

fn validate_start(
    state: &GameState,
    request: &StartRunRequest,
    registry: &DungeonRegistry,
) -> Result<(), StartRunError> {
    let definition = registry
        .dungeon(&request.dungeon_id)
        .ok_or_else(|| StartRunError::UnknownDungeon(request.dungeon_id.clone()))?;

    if request.hero_ids.len() != DUNGEON_PARTY_SIZE {
        return Err(StartRunError::WrongPartySize {
            expected: DUNGEON_PARTY_SIZE,
            found: request.hero_ids.len(),
        });
    }
    let mut seen = BTreeSet::new();
    for hero_id in &request.hero_ids {
        if !seen.insert(hero_id.as_str()) {
            return Err(StartRunError::DuplicateHero(hero_id.clone()));
        }
        let Some(player) = state.players.get(hero_id) else {
            return Err(StartRunError::UnknownHero(hero_id.clone()));
        };
        if state.dungeon.is_hero_busy(hero_id) {
            return Err(StartRunError::HeroBusy(hero_id.clone()));
        }
        if !player.is_idle() {
            return Err(StartRunError::HeroNotIdle(hero_id.clone()));
        }
    }

    let limit = state
        .dungeon
        .policy
        .max_enabled_concurrent_runs
        .min(state.dungeon.policy.max_supported_concurrent_runs);
    let active = state.dungeon.active_run_count();
    if active >= limit {
        return Err(StartRunError::TooManyRuns { active, limit });
    }
    if state.dungeon.runs.contains_key(&request.run_id) {
        return Err(StartRunError::DuplicateRunId(request.run_id.clone()));
    }

    let required = food_cost_for_floor(definition.tier, 1, definition.floor_count);
    let available = state.inventory.count(FOOD_ITEM_ID);
    if available < required {
        return Err(StartRunError::NotEnoughFood {
            required,
            available,
        });
    }
    Ok(())
}

/// Starts a run and spawns its first floor.
///
/// Validation happens first; nothing is written unless every precondition
/// holds. Floor-1 food is paid in the same call, so a run never exists
/// "between floors".
pub fn start_dungeon_run(
    state: &mut GameState,
    request: StartRunRequest,
    registry: &DungeonRegistry,
) -> Result<String, StartRunError> {
    if let Err(err) = validate_start(state, &request, registry) {
        log::debug!("dungeon run {} rejected: {}", request.run_id, err);
        return Err(err);
    }
    let definition = registry
        .dungeon(&request.dungeon_id)
        .ok_or_else(|| StartRunError::UnknownDungeon(request.dungeon_id.clone()))?;

    let party: Vec<HeroCombatState> = request
        .hero_ids
        .iter()
        .filter_map(|id| state.players.get(id))
        .map(build_hero)
        .collect();
    let seed = seed_from_parts(&[&request.run_id, &request.dungeon_id]);
    let tie_order = build_threat_tie_order(seed, &request.hero_ids);

    let mut run = DungeonRunState {
        id: request.run_id.clone(),
        dungeon_id: definition.id.clone(),
        seed,
        run_index: 0,
        status: RunStatus::Running,
        end_reason: None,
        restart_at: None,
        started_at: request.now_ms,
        clock_ms: request.now_ms,
        floor: 1,
        floor_count: definition.floor_count,
        tier: definition.tier,
        encounter_step: 0,
        elapsed_ms: 0,
        step_carry_ms: 0,
        floor_pause_ms: 0,
        threat_by_hero_id: request.hero_ids.iter().map(|id| (id.clone(), 0.0)).collect(),
        threat_tie_order: tie_order,
        cadence: Vec::new(),
        party,
        enemies: Vec::new(),
        next_spawn_index: 0,
        target_enemy_id: None,
        target_hero_id: None,
        events: Vec::new(),
        truncated_events: 0,
        non_critical_event_count: 0,
        step_event_count: 0,
        starting_inventory: state.inventory.snapshot(&tracked_item_ids()),
        loot: None,
    };
    run.cadence = build_cadence(&run.party, &state.players);

    let mut delta = ItemDelta::new();
    initialize_floor(&mut run, definition, &mut state.inventory, &mut delta);

    log::info!(
        "dungeon run {} started in {} with {}",
        run.id,
        definition.id,
        request.hero_ids.join(", ")
    );
    state.dungeon.setup.selected_dungeon_id = Some(definition.id.clone());
    state.dungeon.setup.selected_hero_ids = request.hero_ids.clone();
    state.dungeon.runs.insert(run.id.clone(), run);
    state.dungeon.active_run_id = Some(request.run_id.clone());
    Ok(request.run_id)
}

/// Starts a run from the saved setup with a fresh uuid run id.
pub fn start_dungeon_run_from_setup(
    state: &mut GameState,
    now_ms: i64,
    registry: &DungeonRegistry,
) -> Result<String, StartRunError> {
    let dungeon_id = state
        .dungeon
        .setup
        .selected_dungeon_id
        .clone()
        .unwrap_or_default();
    let request = StartRunRequest {
        run_id: uuid::Uuid::new_v4().to_string(),
        dungeon_id,
        hero_ids: state.dungeon.setup.selected_hero_ids.clone(),
        now_ms,
    };
    start_dungeon_run(state, request, registry)
}

/// Combat record for a hero built from their current stats and gear.
pub fn build_hero(player: &PlayerState) -> HeroCombatState {
    let mut hero = HeroCombatState::new(&player.id, &player.name, player.weapon_type(), 1);
    refresh_hero_stats(&mut hero, player);
    hero.hp = hero.hp_max;
    hero
}

/// Re-derives a hero's stat block from the roster. HP is clamped to the new max.
pub fn refresh_hero_stats(hero: &mut HeroCombatState, player: &PlayerState) {
    let attrs = player.effective_attributes();
    let level = f64::from(player.combat_level());
    let weapon_type = player.weapon_type();

    hero.name = player.name.clone();
    hero.weapon_type = weapon_type;
    hero.armor = player.equipment.armor;
    hero.combat_level = player.combat_level();
    hero.hp_max = resolve_hero_max_hp(level, f64::from(attrs.get(AttributeType::Stamina)));
    hero.hp = hero.hp.clamp(0, hero.hp_max);
    hero.attack_damage =
        resolve_hero_attack_damage(level, f64::from(attrs.get(AttributeType::Strength)));
    hero.attack_interval_ms = resolve_hero_attack_interval_ms(
        HERO_BASE_ATTACK_MS,
        f64::from(attrs.get(AttributeType::Agility)),
        weapon_type,
    );
    hero.heal_amount = if weapon_type == WeaponType::Magic {
        resolve_heal_amount(level, f64::from(attrs.get(AttributeType::Intellect)))
    } else {
        0
    };
}

/// Snapshot of each hero's attack-interval inputs.
pub fn build_cadence(
    party: &[HeroCombatState],
    players: &BTreeMap<String, PlayerState>,
) -> Vec<HeroCadence> {
    party
        .iter()
        .map(|hero| HeroCadence {
            player_id: hero.player_id.clone(),
            agility: players
                .get(&hero.player_id)
                .map(|p| p.effective(AttributeType::Agility))
                .unwrap_or(0),
            weapon_type: hero.weapon_type,
            base_interval_ms: HERO_BASE_ATTACK_MS,
            attack_interval_ms: hero.attack_interval_ms,
            attack_damage: hero.attack_damage,
        })
        .collect()
}

/// Pays for and spawns the current floor.
///
/// Returns false when the party cannot afford the floor; the run is then
/// failed with [`RunEndReason::OutOfFood`] and every hero's HP is zeroed.
/// The caller is responsible for finalizing it.
pub fn initialize_floor(
    run: &mut DungeonRunState,
    definition: &DungeonDefinition,
    inventory: &mut Inventory,
    delta: &mut ItemDelta,
) -> bool {
    let cost = food_cost_for_floor(run.tier, run.floor, run.floor_count);
    if !inventory.has(FOOD_ITEM_ID, cost) {
        for hero in run.party.iter_mut() {
            hero.hp = 0;
        }
        run.status = RunStatus::Failed;
        run.end_reason = Some(RunEndReason::OutOfFood);
        run.enemies.clear();
        let event = ReplayEvent::new(run.elapsed_ms, ReplayEventKind::RunEnd).label("out_of_food");
        push_event(run, event);
        return false;
    }
    inventory.apply(FOOD_ITEM_ID, -cost, delta);

    run.enemies.clear();
    run.target_enemy_id = None;
    run.target_hero_id = None;
    run.floor_pause_ms = 0;
    run.encounter_step = 0;

    let now = run.elapsed_ms;
    let floor_start = ReplayEvent::new(now, ReplayEventKind::FloorStart)
        .amount(i64::from(run.floor))
        .label(format!("Floor {}", run.floor));
    push_event(run, floor_start);

    let wave_seed = seed_from_parts(&[
        &run.seed.to_string(),
        &run.run_index.to_string(),
        &run.floor.to_string(),
        "wave",
    ]);
    let mut rng = seeded_rng(wave_seed);
    let base_hp = resolve_mob_hp(run.tier, run.floor);
    let base_damage = resolve_mob_damage(run.tier, run.floor);

    if run.is_boss_floor() {
        let boss = spawn_enemy(
            run,
            &definition.boss_name,
            (base_hp * BOSS_HP_MULTIPLIER).round() as i64,
            (base_damage * BOSS_DAMAGE_MULTIPLIER).round() as i64,
            Some(definition.boss_mechanic),
        );
        let boss_start = ReplayEvent::new(now, ReplayEventKind::BossStart)
            .source(&boss)
            .label(definition.boss_name.clone());
        push_event(run, boss_start);
    } else {
        let count = rng.gen_range(MOB_MIN_WAVE..=MOB_MAX_WAVE);
        for _ in 0..count {
            let name = definition
                .mob_names
                .get(rng.gen_range(0..definition.mob_names.len().max(1)))
                .cloned()
                .unwrap_or_else(|| "Monster".to_string());
            let variance = 1.0 + (rng.gen::<f64>() * 2.0 - 1.0) * MOB_VARIANCE;
            spawn_enemy(
                run,
                &name,
                (base_hp * variance).round() as i64,
                (base_damage * variance).round() as i64,
                None,
            );
        }
    }
    log::debug!(
        "run {} floor {}/{} spawned {} enemies",
        run.id,
        run.floor,
        run.floor_count,
        run.enemies.len()
    );
    true
}

/// Adds an enemy to the wave and emits its spawn event. Returns the enemy id.
pub(crate) fn spawn_enemy(
    run: &mut DungeonRunState,
    name: &str,
    hp: i64,
    damage: i64,
    mechanic: Option<BossMechanic>,
) -> String {
    let spawn_index = run.next_spawn_index;
    run.next_spawn_index += 1;
    let id = format!("enemy-{}", spawn_index);
    let is_boss = mechanic.is_some();
    let attack_interval_ms = if is_boss {
        BOSS_ATTACK_INTERVAL_MS
    } else {
        ENEMY_ATTACK_INTERVAL_MS
    };
    let hp = hp.max(1);
    run.enemies.push(EnemyState {
        id: id.clone(),
        name: name.to_string(),
        hp,
        hp_max: hp,
        damage: damage.max(1),
        is_boss,
        mechanic,
        spawn_index,
        attack_interval_ms,
        attack_cooldown_ms: attack_interval_ms,
        mechanic_cooldown_ms: mechanic.map(mechanic_interval_ms).unwrap_or(0),
        attack_count: 0,
        shield_until_ms: 0,
        enraged: false,
        is_add: false,
    });
    let event = ReplayEvent::new(run.elapsed_ms, ReplayEventKind::Spawn)
        .source(&id)
        .amount(hp)
        .label(name.to_string());
    push_event(run, event);
    id
}

/// Period of a boss's timed mechanic; 0 for mechanics that are not timed.
pub fn mechanic_interval_ms(mechanic: BossMechanic) -> i64 {
    match mechanic {
        BossMechanic::Poison => BOSS_POISON_INTERVAL_MS,
        BossMechanic::Summon => BOSS_SUMMON_INTERVAL_MS,
        BossMechanic::Shield => BOSS_SHIELD_INTERVAL_MS,
        BossMechanic::Burst | BossMechanic::Enrage => 0,
    }
}

/// Restores every hero to full HP and clears stun and taunt windows.
pub fn recover_party(run: &mut DungeonRunState) {
    for hero in run.party.iter_mut() {
        hero.hp = hero.hp_max;
        hero.stun_until_ms = 0;
        hero.clear_taunt();
    }
}

fn journal_line(at_ms: i64, text: String) -> JournalEntry {
    JournalEntry { at_ms, text }
}

/// Records a finished run: replay, completion counter and journal lines.
///
/// Call [`refresh_active_run_id`] once the run is back in `dungeon.runs`.
pub fn finalize_run(
    dungeon: &mut DungeonState,
    run: &DungeonRunState,
    players: &BTreeMap<String, PlayerState>,
    registry: &DungeonRegistry,
    journal: &mut Vec<JournalEntry>,
) {
    let replay = build_replay(run, players, run.clock_ms);
    if run.status == RunStatus::Victory {
        *dungeon
            .completion_counts
            .entry(run.dungeon_id.clone())
            .or_insert(0) += 1;
    }
    dungeon.latest_replay = Some(replay);

    let name = registry
        .dungeon(&run.dungeon_id)
        .map(|d| d.name.as_str())
        .unwrap_or(run.dungeon_id.as_str());
    let reason = run.end_reason.unwrap_or(RunEndReason::Stopped);
    journal.push(journal_line(
        run.clock_ms,
        format!("Dungeon ended: {} ({})", name, reason.label()),
    ));
    if run.status == RunStatus::Victory {
        if let Some(loot) = &run.loot {
            journal.push(journal_line(
                run.clock_ms,
                format!("Loot: +{} {}", loot.quantity, registry.item_name(&loot.item_id)),
            ));
        }
    }
    log::info!(
        "dungeon run {} ended: {} on floor {}/{} after {} ms ({} events dropped)",
        run.id,
        reason.label(),
        run.floor,
        run.floor_count,
        run.elapsed_ms,
        run.truncated_events
    );
}

/// Keeps `active_run_id` pointing at a live run, or clears it.
pub fn refresh_active_run_id(dungeon: &mut DungeonState) {
    let current_is_active = dungeon
        .active_run_id
        .as_ref()
        .and_then(|id| dungeon.runs.get(id))
        .is_some_and(DungeonRunState::is_active);
    if current_is_active {
        return;
    }
    dungeon.active_run_id = dungeon
        .active_runs()
        .min_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)))
        .map(|run| run.id.clone());
}

/// Drops the oldest finished runs beyond [`DUNGEON_RUN_HISTORY_LIMIT`].
/// Active runs are always kept.
pub fn prune_run_history(dungeon: &mut DungeonState) {
    let mut finished: Vec<(i64, String)> = dungeon
        .runs
        .values()
        .filter(|run| !run.is_active())
        .map(|run| (run.clock_ms, run.id.clone()))
        .collect();
    if finished.len() <= DUNGEON_RUN_HISTORY_LIMIT {
        return;
    }
    finished.sort_by(|a, b| b.cmp(a));
    for (_, id) in finished.into_iter().skip(DUNGEON_RUN_HISTORY_LIMIT) {
        dungeon.runs.remove(&id);
    }
}

/// Schedules the next auto-restart of a won run.
pub fn schedule_restart(run: &mut DungeonRunState) {
    run.restart_at = Some(run.clock_ms + DUNGEON_AUTO_RESTART_DELAY_MS);
}

/// Fires a due auto-restart.
///
/// The run goes back to floor 1 with a fresh event log when a hero is alive
/// and the party can pay for floor 1. Otherwise it ends as
/// [`RunEndReason::Stopped`] and a journal line is written; the replay of
/// the won run is kept.
pub fn process_restart(
    run: &mut DungeonRunState,
    definition: &DungeonDefinition,
    players: &BTreeMap<String, PlayerState>,
    inventory: &mut Inventory,
    delta: &mut ItemDelta,
    journal: &mut Vec<JournalEntry>,
) {
    run.restart_at = None;
    let cost = food_cost_for_floor(run.tier, 1, run.floor_count);
    if !run.any_hero_alive() || !inventory.has(FOOD_ITEM_ID, cost) {
        run.status = RunStatus::Failed;
        run.end_reason = Some(RunEndReason::Stopped);
        journal.push(journal_line(
            run.clock_ms,
            format!(
                "Dungeon ended: {} ({})",
                definition.name,
                RunEndReason::Stopped.label()
            ),
        ));
        log::debug!("run {} could not restart", run.id);
        return;
    }

    run.run_index += 1;
    run.status = RunStatus::Running;
    run.end_reason = None;
    run.started_at = run.clock_ms;
    run.floor = 1;
    run.elapsed_ms = 0;
    run.floor_pause_ms = 0;
    run.events.clear();
    run.truncated_events = 0;
    run.non_critical_event_count = 0;
    run.step_event_count = 0;
    run.loot = None;
    for value in run.threat_by_hero_id.values_mut() {
        *value = 0.0;
    }
    for hero in run.party.iter_mut() {
        if let Some(player) = players.get(&hero.player_id) {
            refresh_hero_stats(hero, player);
        }
        hero.hp = hero.hp_max;
        hero.attack_cooldown_ms = 0;
        hero.heal_cooldown_ms = 0;
        hero.potion_cooldown_ms = 0;
        hero.taunt_cooldown_ms = 0;
        hero.stun_until_ms = 0;
        hero.clear_taunt();
    }
    run.cadence = build_cadence(&run.party, players);
    run.starting_inventory = inventory.snapshot(&tracked_item_ids());
    log::debug!("run {} restarting as run #{}", run.id, run.run_index);
    initialize_floor(run, definition, inventory, delta);
}

/// Stops an active run immediately.
///
/// A running run ends as [`RunEndReason::Stopped`] with the party healed and
/// a replay built. A won run waiting for auto-restart is not failed: it keeps
/// its `Victory` status and victory replay, and only the pending restart is
/// cancelled. Returns `None` when there is no such active run.
pub fn stop_dungeon_run(
    state: &mut GameState,
    run_id: &str,
    registry: &DungeonRegistry,
) -> Option<Vec<JournalEntry>> {
    let mut run = state.dungeon.runs.remove(run_id)?;
    if !run.is_active() {
        state.dungeon.runs.insert(run.id.clone(), run);
        return None;
    }

    let mut journal = Vec::new();
    if run.status == RunStatus::Running {
        run.status = RunStatus::Failed;
        run.end_reason = Some(RunEndReason::Stopped);
        run.restart_at = None;
        recover_party(&mut run);
        let event = ReplayEvent::new(run.elapsed_ms, ReplayEventKind::RunEnd).label("stopped");
        push_event(&mut run, event);
        finalize_run(&mut state.dungeon, &run, &state.players, registry, &mut journal);
    } else {
        run.restart_at = None;
        log::info!("dungeon run {} auto-restart cancelled", run.id);
    }
    state.dungeon.runs.insert(run.id.clone(), run);
    refresh_active_run_id(&mut state.dungeon);
    prune_run_history(&mut state.dungeon);
    Some(journal)
}

pub fn complete_onboarding(state: &mut GameState) {
    state.dungeon.onboarding_required = false;
}

/// Selects the dungeon for the next run. Unknown ids are ignored.
pub fn select_dungeon(state: &mut GameState, dungeon_id: &str, registry: &DungeonRegistry) -> bool {
    if registry.dungeon(dungeon_id).is_none() {
        return false;
    }
    state.dungeon.setup.selected_dungeon_id = Some(dungeon_id.to_string());
    true
}

/// Stores the party for the next run: known heroes only, no duplicates, at
/// most a full party. Returns the stored ids.
pub fn set_party(state: &mut GameState, hero_ids: &[String]) -> Vec<String> {
    let mut party: Vec<String> = Vec::new();
    for id in hero_ids {
        if party.len() == DUNGEON_PARTY_SIZE {
            break;
        }
        if state.players.contains_key(id) && !party.contains(id) {
            party.push(id.clone());
        }
    }
    state.dungeon.setup.selected_hero_ids = party.clone();
    party
}

/// Turning auto-restart off also cancels restarts that are already pending.
pub fn set_auto_restart(state: &mut GameState, enabled: bool) {
    state.dungeon.setup.auto_restart = enabled;
    if enabled {
        return;
    }
    for run in state.dungeon.runs.values_mut() {
        run.restart_at = None;
    }
    refresh_active_run_id(&mut state.dungeon);
}

pub fn set_auto_consumables(state: &mut GameState, enabled: bool) {
    state.dungeon.setup.auto_consumables = enabled;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Attributes;

    fn roster_state(food: i64) -> GameState {
        let mut state = GameState::new(0);
        for (id, weapon) in [
            ("p1", WeaponType::Melee),
            ("p2", WeaponType::Ranged),
            ("p3", WeaponType::Magic),
            ("p4", WeaponType::Ranged),
            ("p5", WeaponType::Melee),
        ] {
            let mut player = PlayerState::new(id, id.to_uppercase());
            player.equipment.weapon_type = weapon;
            player.attributes = Attributes::new().with(AttributeType::Strength, 5);
            state.add_player(player);
        }
        state.inventory = Inventory::new().with_item(FOOD_ITEM_ID, food);
        state
    }

    fn request(run_id: &str, heroes: &[&str]) -> StartRunRequest {
        StartRunRequest {
            run_id: run_id.to_string(),
            dungeon_id: "goblin_warren".to_string(),
            hero_ids: heroes.iter().map(|s| s.to_string()).collect(),
            now_ms: 1_000,
        }
    }

    #[test]
    fn test_start_spawns_floor_one_and_pays_food() {
        let registry = DungeonRegistry::builtin().unwrap();
        let mut state = roster_state(20);
        let id = start_dungeon_run(&mut state, request("r1", &["p1", "p2", "p3", "p4"]), &registry)
            .unwrap();
        let run = &state.dungeon.runs[&id];
        assert_eq!(run.floor, 1);
        assert_eq!(run.party.len(), DUNGEON_PARTY_SIZE);
        assert!(!run.enemies.is_empty() && run.enemies.len() <= 3);
        assert_eq!(run.threat_tie_order.len(), 4);
        assert_eq!(run.cadence.len(), 4);
        assert_eq!(state.inventory.count(FOOD_ITEM_ID), 20 - food_cost_for_floor(1, 1, 10));
        assert_eq!(run.starting_inventory[FOOD_ITEM_ID], 20);
        assert_eq!(state.dungeon.active_run_id.as_deref(), Some("r1"));
        assert_eq!(run.events[0].kind, ReplayEventKind::FloorStart);
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let registry = DungeonRegistry::builtin().unwrap();
        let mut state = roster_state(20);
        state.players.get_mut("p5").unwrap().current_action = Some("woodcutting".to_string());

        let cases: Vec<(StartRunRequest, StartRunError)> = vec![
            (
                request("r", &["p1", "p2", "p3"]),
                StartRunError::WrongPartySize {
                    expected: 4,
                    found: 3,
                },
            ),
            (
                request("r", &["p1", "p2", "p3", "p3"]),
                StartRunError::DuplicateHero("p3".to_string()),
            ),
            (
                request("r", &["p1", "p2", "p3", "ghost"]),
                StartRunError::UnknownHero("ghost".to_string()),
            ),
            (
                request("r", &["p1", "p2", "p3", "p5"]),
                StartRunError::HeroNotIdle("p5".to_string()),
            ),
            (
                StartRunRequest {
                    dungeon_id: "nowhere".to_string(),
                    ..request("r", &["p1", "p2", "p3", "p4"])
                },
                StartRunError::UnknownDungeon("nowhere".to_string()),
            ),
        ];
        for (req, expected) in cases {
            let mut attempt = state.clone();
            assert_eq!(start_dungeon_run(&mut attempt, req, &registry), Err(expected));
            assert_eq!(attempt, state, "rejected start must not mutate state");
        }

        let mut hungry = roster_state(0);
        let before = hungry.clone();
        assert!(matches!(
            start_dungeon_run(&mut hungry, request("r", &["p1", "p2", "p3", "p4"]), &registry),
            Err(StartRunError::NotEnoughFood { .. })
        ));
        assert_eq!(hungry, before);
    }

    #[test]
    fn test_busy_heroes_and_concurrency_limit() {
        let registry = DungeonRegistry::builtin().unwrap();
        let mut state = roster_state(50);
        start_dungeon_run(&mut state, request("r1", &["p1", "p2", "p3", "p4"]), &registry).unwrap();

        let err = start_dungeon_run(&mut state, request("r2", &["p5", "p2", "p3", "p4"]), &registry)
            .unwrap_err();
        assert_eq!(err, StartRunError::HeroBusy("p2".to_string()));

        state.dungeon.policy.max_enabled_concurrent_runs = 1;
        let mut other = state.clone();
        other.add_player(PlayerState::new("p6", "P6"));
        other.add_player(PlayerState::new("p7", "P7"));
        other.add_player(PlayerState::new("p8", "P8"));
        let err = start_dungeon_run(&mut other, request("r2", &["p5", "p6", "p7", "p8"]), &registry)
            .unwrap_err();
        assert!(matches!(err, StartRunError::TooManyRuns { active: 1, limit: 1 }));
    }

    #[test]
    fn test_out_of_food_floor_fails_run_and_zeroes_hp() {
        let registry = DungeonRegistry::builtin().unwrap();
        let mut state = roster_state(20);
        start_dungeon_run(&mut state, request("r1", &["p1", "p2", "p3", "p4"]), &registry).unwrap();
        let definition = registry.dungeon("goblin_warren").unwrap();
        let mut run = state.dungeon.runs["r1"].clone();
        let mut empty = Inventory::new();
        run.floor = 2;
        assert!(!initialize_floor(&mut run, definition, &mut empty, &mut ItemDelta::new()));
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.end_reason, Some(RunEndReason::OutOfFood));
        assert!(run.party.iter().all(|h| h.hp == 0));
        assert_eq!(run.events.last().unwrap().kind, ReplayEventKind::RunEnd);
    }

    #[test]
    fn test_boss_floor_spawns_single_scaled_boss() {
        let registry = DungeonRegistry::builtin().unwrap();
        let definition = registry.dungeon("goblin_warren").unwrap();
        let mut run = DungeonRunState::empty_for_test();
        run.floor = run.floor_count;
        let mut inventory = Inventory::new().with_item(FOOD_ITEM_ID, 10);
        assert!(initialize_floor(&mut run, definition, &mut inventory, &mut ItemDelta::new()));
        assert_eq!(run.enemies.len(), 1);
        let boss = &run.enemies[0];
        assert!(boss.is_boss);
        assert_eq!(boss.mechanic, Some(BossMechanic::Burst));
        assert_eq!(boss.hp, (resolve_mob_hp(1, 10) * BOSS_HP_MULTIPLIER).round() as i64);
        assert!(run.events.iter().any(|e| e.kind == ReplayEventKind::BossStart));
        assert_eq!(inventory.count(FOOD_ITEM_ID), 10 - food_cost_for_floor(1, 10, 10));
    }

    #[test]
    fn test_wave_spawn_is_seeded() {
        let registry = DungeonRegistry::builtin().unwrap();
        let definition = registry.dungeon("goblin_warren").unwrap();
        let spawn = || {
            let mut run = DungeonRunState::empty_for_test();
            run.floor = 3;
            let mut inventory = Inventory::new().with_item(FOOD_ITEM_ID, 10);
            initialize_floor(&mut run, definition, &mut inventory, &mut ItemDelta::new());
            run.enemies
        };
        let first = spawn();
        assert_eq!(first, spawn());
        let base = resolve_mob_hp(1, 3);
        for enemy in &first {
            let ratio = enemy.hp as f64 / base;
            assert!((0.88..=1.12).contains(&ratio), "hp variance out of range: {}", ratio);
        }
    }

    #[test]
    fn test_stop_run_recovers_party_and_builds_replay() {
        let registry = DungeonRegistry::builtin().unwrap();
        let mut state = roster_state(20);
        start_dungeon_run(&mut state, request("r1", &["p1", "p2", "p3", "p4"]), &registry).unwrap();
        state.dungeon.runs.get_mut("r1").unwrap().party[0].hp = 3;

        let journal = stop_dungeon_run(&mut state, "r1", &registry).unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].text, "Dungeon ended: Goblin Warren (Stopped)");
        let run = &state.dungeon.runs["r1"];
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.end_reason, Some(RunEndReason::Stopped));
        assert!(run.party.iter().all(|h| h.hp == h.hp_max));
        assert!(state.dungeon.active_run_id.is_none());
        let replay = state.dungeon.latest_replay.as_ref().unwrap();
        assert_eq!(replay.end_reason, Some(RunEndReason::Stopped));
        assert_eq!(state.dungeon.completions("goblin_warren"), 0);

        assert!(stop_dungeon_run(&mut state, "r1", &registry).is_none());
    }

    #[test]
    fn test_prune_keeps_active_and_newest_finished() {
        let mut dungeon = DungeonState::default();
        for i in 0..8 {
            let mut run = DungeonRunState::empty_for_test();
            run.id = format!("old-{}", i);
            run.clock_ms = i;
            run.status = RunStatus::Failed;
            dungeon.runs.insert(run.id.clone(), run);
        }
        let mut live = DungeonRunState::empty_for_test();
        live.id = "live".to_string();
        dungeon.runs.insert(live.id.clone(), live);

        prune_run_history(&mut dungeon);
        assert_eq!(dungeon.runs.len(), DUNGEON_RUN_HISTORY_LIMIT + 1);
        assert!(dungeon.runs.contains_key("live"));
        assert!(dungeon.runs.contains_key("old-7"));
        assert!(!dungeon.runs.contains_key("old-0"));
    }

    #[test]
    fn test_setup_operations() {
        let registry = DungeonRegistry::builtin().unwrap();
        let mut state = roster_state(20);
        complete_onboarding(&mut state);
        assert!(!state.dungeon.onboarding_required);

        assert!(!select_dungeon(&mut state, "nowhere", &registry));
        assert!(select_dungeon(&mut state, "goblin_warren", &registry));

        let ids: Vec<String> = ["p1", "p1", "ghost", "p2", "p3", "p4", "p5"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set_party(&mut state, &ids), vec!["p1", "p2", "p3", "p4"]);

        set_auto_consumables(&mut state, true);
        assert!(state.dungeon.setup.auto_consumables);

        let id = start_dungeon_run_from_setup(&mut state, 5, &registry).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_eq!(state.dungeon.active_run_id, Some(id));
    }

    #[test]
    fn test_restart_without_food_stops_run() {
        let registry = DungeonRegistry::builtin().unwrap();
        let definition = registry.dungeon("goblin_warren").unwrap();
        let mut state = roster_state(20);
        start_dungeon_run(&mut state, request("r1", &["p1", "p2", "p3", "p4"]), &registry).unwrap();
        let mut run = state.dungeon.runs["r1"].clone();
        run.status = RunStatus::Victory;
        run.end_reason = Some(RunEndReason::Victory);
        schedule_restart(&mut run);

        let mut journal = Vec::new();
        let mut empty = Inventory::new();
        process_restart(
            &mut run,
            definition,
            &state.players,
            &mut empty,
            &mut ItemDelta::new(),
            &mut journal,
        );
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.end_reason, Some(RunEndReason::Stopped));
        assert!(run.restart_at.is_none());
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn test_restart_resets_to_floor_one_with_fresh_log() {
        let registry = DungeonRegistry::builtin().unwrap();
        let definition = registry.dungeon("goblin_warren").unwrap();
        let mut state = roster_state(20);
        start_dungeon_run(&mut state, request("r1", &["p1", "p2", "p3", "p4"]), &registry).unwrap();
        let mut run = state.dungeon.runs["r1"].clone();
        run.floor = 10;
        run.status = RunStatus::Victory;
        run.end_reason = Some(RunEndReason::Victory);
        run.truncated_events = 9;
        schedule_restart(&mut run);

        let mut journal = Vec::new();
        process_restart(
            &mut run,
            definition,
            &state.players,
            &mut state.inventory,
            &mut ItemDelta::new(),
            &mut journal,
        );
        assert!(journal.is_empty());
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.run_index, 1);
        assert_eq!(run.floor, 1);
        assert_eq!(run.truncated_events, 0);
        assert_eq!(run.events[0].kind, ReplayEventKind::FloorStart);
    }
}
