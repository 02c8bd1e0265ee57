//! Fixed-step dungeon simulation.
//!
//! A tick converts an arbitrary wall-clock delta into whole
//! `DUNGEON_SIMULATION_STEP_MS` steps; leftover time is carried to the next
//! tick. Because a step is never partially simulated, one long tick and many
//! short ticks covering the same time produce the same state.
//!
//! Each step runs fixed phases:
//!
//! 1. wipe check, clock and cooldown advance, inter-floor pause
//! 2. threat decay and taunts
//! 3. hero attacks
//! 4. wave clear: XP, and on the last floor gold, loot and victory
//! 5. boss mechanics and enemy attacks
//! 6. heals and potions
//! 7. wipe check

use super::definitions::{BossMechanic, DungeonDefinition, DungeonRegistry};
use super::lifecycle::{
    finalize_run, initialize_floor, process_restart, prune_run_history, recover_party,
    refresh_active_run_id, schedule_restart, spawn_enemy,
};
use super::loot::roll_dungeon_loot_reward;
use super::normalize::ensure_run_bookkeeping;
use super::replay::{push_event, ReplayEvent, ReplayEventKind};
use super::threat::{
    add_threat, clear_hero_threat, decay_threat, resolve_target_enemy_id, resolve_target_hero_id,
    update_taunts,
};
use super::types::{DungeonRunState, DungeonState, JournalEntry, RunEndReason, RunStatus};
use crate::character::{CombatSkill, PlayerId, PlayerState, WeaponType};
use crate::core::combat_math::{
    combat_xp_for_wave, mitigate_incoming_damage, resolve_mob_damage, resolve_mob_hp,
    resolve_threat_multiplier, victory_gold,
};
use crate::core::constants::*;
use crate::core::game_state::GameState;
use crate::core::rng::seed_from_parts;
use crate::inventory::{Inventory, ItemDelta};
use std::collections::BTreeMap;

const STEP_MS: i64 = DUNGEON_SIMULATION_STEP_MS;

/// Everything one dungeon tick produced.
#[derive(Debug, Clone, Default)]
pub struct DungeonTickResult {
    pub state: GameState,
    /// Net inventory change: food paid, potions drunk, gold and loot won.
    pub item_delta: ItemDelta,
    pub combat_xp_by_player: BTreeMap<PlayerId, BTreeMap<CombatSkill, u64>>,
    /// Milliseconds each hero spent in active combat.
    pub combat_ms_by_player: BTreeMap<PlayerId, i64>,
    pub journal: Vec<JournalEntry>,
}

#[derive(Default)]
struct TickOutput {
    item_delta: ItemDelta,
    combat_xp_by_player: BTreeMap<PlayerId, BTreeMap<CombatSkill, u64>>,
    combat_ms_by_player: BTreeMap<PlayerId, i64>,
    journal: Vec<JournalEntry>,
}

/// Borrowed view of everything a run may touch while it is being stepped.
/// The run itself is taken out of `dungeon.runs` for the duration.
struct RunContext<'a> {
    definition: &'a DungeonDefinition,
    registry: &'a DungeonRegistry,
    dungeon: &'a mut DungeonState,
    players: &'a mut BTreeMap<PlayerId, PlayerState>,
    inventory: &'a mut Inventory,
    out: &'a mut TickOutput,
}

/// Advances every active run by `delta_ms` and returns the new state.
///
/// The input state is never modified. The shared inventory is copied once,
/// mutated by each run in turn and installed at the end.
pub fn apply_dungeon_tick(
    state: &GameState,
    delta_ms: i64,
    registry: &DungeonRegistry,
) -> DungeonTickResult {
    let mut next = state.clone();
    let mut inventory = next.inventory.clone();
    let mut out = TickOutput::default();
    let delta_ms = delta_ms.max(0);

    let run_ids: Vec<String> = next
        .dungeon
        .runs
        .values()
        .filter(|run| run.is_active())
        .map(|run| run.id.clone())
        .collect();

    for run_id in run_ids {
        let Some(mut run) = next.dungeon.runs.remove(&run_id) else {
            continue;
        };
        match registry.dungeon(&run.dungeon_id) {
            Some(definition) => {
                let mut ctx = RunContext {
                    definition,
                    registry,
                    dungeon: &mut next.dungeon,
                    players: &mut next.players,
                    inventory: &mut inventory,
                    out: &mut out,
                };
                advance_run(&mut run, delta_ms, &mut ctx);
            }
            None => log::warn!(
                "run {} references unknown dungeon {}; skipped",
                run.id,
                run.dungeon_id
            ),
        }
        next.dungeon.runs.insert(run_id, run);
    }

    next.inventory = inventory;
    refresh_active_run_id(&mut next.dungeon);
    prune_run_history(&mut next.dungeon);

    DungeonTickResult {
        state: next,
        item_delta: out.item_delta,
        combat_xp_by_player: out.combat_xp_by_player,
        combat_ms_by_player: out.combat_ms_by_player,
        journal: out.journal,
    }
}

fn advance_run(run: &mut DungeonRunState, delta_ms: i64, ctx: &mut RunContext) {
    let repairs = ensure_run_bookkeeping(run, ctx.players);
    if repairs > 0 {
        log::warn!("run {}: repaired {} bookkeeping fields", run.id, repairs);
    }

    if run.status != RunStatus::Running && run.restart_at.is_some_and(|at| run.clock_ms >= at) {
        restart_run(run, ctx);
    }

    run.step_carry_ms += delta_ms;
    let steps = run.step_carry_ms / STEP_MS;
    run.step_carry_ms %= STEP_MS;

    for _ in 0..steps {
        if run.status == RunStatus::Running {
            simulate_step(run, ctx);
        } else if let Some(restart_at) = run.restart_at {
            run.clock_ms += STEP_MS;
            if run.clock_ms >= restart_at {
                restart_run(run, ctx);
            }
        } else {
            break;
        }
    }

    if !run.is_active() {
        run.step_carry_ms = 0;
    }
}

fn restart_run(run: &mut DungeonRunState, ctx: &mut RunContext) {
    process_restart(
        run,
        ctx.definition,
        ctx.players,
        ctx.inventory,
        &mut ctx.out.item_delta,
        &mut ctx.out.journal,
    );
}

/// Simulates exactly one step of a running run.
fn simulate_step(run: &mut DungeonRunState, ctx: &mut RunContext) {
    if !run.any_hero_alive() {
        end_run(run, RunEndReason::Wipe, ctx);
        return;
    }

    // 1. clock, cooldowns, pause
    run.step_event_count = 0;
    run.elapsed_ms += STEP_MS;
    run.clock_ms += STEP_MS;
    advance_cooldowns(run);

    if run.floor_pause_ms > 0 {
        run.floor_pause_ms -= STEP_MS;
        if run.floor_pause_ms <= 0 {
            run.floor_pause_ms = 0;
            run.floor = (run.floor + 1).min(run.floor_count);
            if !initialize_floor(run, ctx.definition, ctx.inventory, &mut ctx.out.item_delta) {
                finalize_run(ctx.dungeon, run, ctx.players, ctx.registry, &mut ctx.out.journal);
            }
        }
        return;
    }

    run.encounter_step += 1;
    for hero in run.party.iter().filter(|h| h.is_alive()) {
        *ctx
            .out
            .combat_ms_by_player
            .entry(hero.player_id.clone())
            .or_insert(0) += STEP_MS;
    }

    // 2. aggro upkeep
    decay_threat(run);
    update_taunts(run);

    // 3. heroes strike
    hero_attack_phase(run);

    // 4. wave cleared
    if !run.any_enemy_alive() {
        resolve_wave_cleared(run, ctx);
        return;
    }

    // 5. enemies strike
    boss_mechanic_phase(run, ctx.definition);
    enemy_attack_phase(run);

    // 6. support
    heal_phase(run);
    if ctx.dungeon.setup.auto_consumables {
        potion_phase(run, ctx.inventory, &mut ctx.out.item_delta);
    }

    // 7. wipe
    if !run.any_hero_alive() {
        end_run(run, RunEndReason::Wipe, ctx);
    }
}

fn tick_cooldown(value: &mut i64) {
    *value = (*value - STEP_MS).max(-STEP_MS);
}

fn advance_cooldowns(run: &mut DungeonRunState) {
    for hero in run.party.iter_mut() {
        tick_cooldown(&mut hero.attack_cooldown_ms);
        tick_cooldown(&mut hero.heal_cooldown_ms);
        tick_cooldown(&mut hero.potion_cooldown_ms);
        tick_cooldown(&mut hero.taunt_cooldown_ms);
    }
    for enemy in run.enemies.iter_mut().filter(|e| e.is_alive()) {
        tick_cooldown(&mut enemy.attack_cooldown_ms);
        tick_cooldown(&mut enemy.mechanic_cooldown_ms);
    }
}

/// Marks the run failed, emits `run_end` and finalizes it.
fn end_run(run: &mut DungeonRunState, reason: RunEndReason, ctx: &mut RunContext) {
    run.status = RunStatus::Failed;
    run.end_reason = Some(reason);
    run.restart_at = None;
    let event = ReplayEvent::new(run.elapsed_ms, ReplayEventKind::RunEnd).label(reason.label());
    push_event(run, event);
    finalize_run(ctx.dungeon, run, ctx.players, ctx.registry, &mut ctx.out.journal);
}

fn hero_attack_phase(run: &mut DungeonRunState) {
    let now = run.elapsed_ms;
    for index in 0..run.party.len() {
        if !run.party[index].is_alive() || run.party[index].is_stunned(now) {
            continue;
        }
        let hero_id = run.party[index].player_id.clone();
        let weapon_type = run.party[index].weapon_type;
        let damage = run.party[index].attack_damage.max(1);
        let interval = run.party[index].attack_interval_ms.max(1);

        let mut attacks = 0;
        while run.party[index].attack_cooldown_ms <= 0 && attacks < DUNGEON_ATTACKS_PER_STEP_CAP {
            let Some(target_id) = resolve_target_enemy_id(run) else {
                break;
            };
            let Some(enemy_index) = run.enemies.iter().position(|e| e.id == target_id) else {
                break;
            };
            run.target_enemy_id = Some(target_id.clone());

            let enemy = &mut run.enemies[enemy_index];
            let hit = if enemy.is_shielded(now) {
                ((damage as f64 * (1.0 - BOSS_SHIELD_DAMAGE_REDUCTION)).round() as i64).max(1)
            } else {
                damage
            };
            let dealt = hit.min(enemy.hp);
            enemy.hp -= dealt;
            let killed = !enemy.is_alive();

            run.party[index].attack_cooldown_ms += interval;
            attacks += 1;
            add_threat(run, &hero_id, dealt as f64 * resolve_threat_multiplier(weapon_type));

            push_event(
                run,
                ReplayEvent::new(now, ReplayEventKind::Attack)
                    .source(&hero_id)
                    .target(&target_id),
            );
            push_event(
                run,
                ReplayEvent::new(now, ReplayEventKind::Damage)
                    .source(&hero_id)
                    .target(&target_id)
                    .amount(dealt),
            );
            if killed {
                push_event(
                    run,
                    ReplayEvent::new(now, ReplayEventKind::Death)
                        .source(&hero_id)
                        .target(&target_id),
                );
                run.target_enemy_id = None;
            }
        }
        // no banking past the cap
        if attacks >= DUNGEON_ATTACKS_PER_STEP_CAP && run.party[index].attack_cooldown_ms <= 0 {
            run.party[index].attack_cooldown_ms = 0;
        }
    }
}

fn resolve_wave_cleared(run: &mut DungeonRunState, ctx: &mut RunContext) {
    let boss_floor = run.is_boss_floor();
    let xp = combat_xp_for_wave(run.tier, run.floor, boss_floor);
    for hero in run.party.iter().filter(|h| h.is_alive()) {
        let skill = hero.weapon_type.combat_skill();
        if let Some(player) = ctx.players.get_mut(&hero.player_id) {
            player.skill_mut(skill).add_xp(xp);
        }
        *ctx
            .out
            .combat_xp_by_player
            .entry(hero.player_id.clone())
            .or_default()
            .entry(skill)
            .or_insert(0) += xp;
    }
    run.target_enemy_id = None;

    if !boss_floor {
        run.floor_pause_ms = DUNGEON_FLOOR_PAUSE_MS;
        return;
    }

    let gold = victory_gold(run.tier, run.floor_count);
    ctx.inventory
        .apply(GOLD_ITEM_ID, gold, &mut ctx.out.item_delta);

    let loot_seed = seed_from_parts(&[
        &run.seed.to_string(),
        &run.run_index.to_string(),
        &run.floor.to_string(),
        "loot",
    ]);
    run.loot = roll_dungeon_loot_reward(&ctx.definition.loot_table, loot_seed);
    if let Some(loot) = &run.loot {
        ctx.inventory
            .apply(&loot.item_id, i64::from(loot.quantity), &mut ctx.out.item_delta);
    }

    run.status = RunStatus::Victory;
    run.end_reason = Some(RunEndReason::Victory);
    recover_party(run);
    let event = ReplayEvent::new(run.elapsed_ms, ReplayEventKind::RunEnd)
        .amount(gold)
        .label(RunEndReason::Victory.label());
    push_event(run, event);
    finalize_run(ctx.dungeon, run, ctx.players, ctx.registry, &mut ctx.out.journal);

    if ctx.dungeon.setup.auto_restart {
        schedule_restart(run);
    }
}

/// Timed boss mechanics (poison, summon, shield) and the enrage threshold.
fn boss_mechanic_phase(run: &mut DungeonRunState, definition: &DungeonDefinition) {
    let now = run.elapsed_ms;
    let bosses: Vec<usize> = run
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_boss && e.is_alive())
        .map(|(i, _)| i)
        .collect();

    for index in bosses {
        let Some(mechanic) = run.enemies[index].mechanic else {
            continue;
        };
        match mechanic {
            BossMechanic::Enrage => {
                let boss = &mut run.enemies[index];
                if !boss.enraged && boss.hp_ratio() < BOSS_ENRAGE_HP_RATIO {
                    boss.enraged = true;
                }
            }
            BossMechanic::Burst => {}
            BossMechanic::Poison | BossMechanic::Summon | BossMechanic::Shield => {
                if run.enemies[index].mechanic_cooldown_ms > 0 {
                    continue;
                }
                run.enemies[index].mechanic_cooldown_ms += match mechanic {
                    BossMechanic::Poison => BOSS_POISON_INTERVAL_MS,
                    BossMechanic::Summon => BOSS_SUMMON_INTERVAL_MS,
                    _ => BOSS_SHIELD_INTERVAL_MS,
                };
                match mechanic {
                    BossMechanic::Poison => poison_party(run, index),
                    BossMechanic::Summon => summon_adds(run, definition),
                    _ => run.enemies[index].shield_until_ms = now + BOSS_SHIELD_DURATION_MS,
                }
            }
        }
    }
}

fn poison_party(run: &mut DungeonRunState, boss_index: usize) {
    let now = run.elapsed_ms;
    let boss_id = run.enemies[boss_index].id.clone();
    let mut any_died = false;
    for index in 0..run.party.len() {
        let hero = &mut run.party[index];
        if !hero.is_alive() {
            continue;
        }
        let tick = ((hero.hp_max as f64 * BOSS_POISON_HP_RATIO).round() as i64)
            .max(1)
            .min(hero.hp);
        hero.hp -= tick;
        let hero_id = hero.player_id.clone();
        let died = !hero.is_alive();

        push_event(
            run,
            ReplayEvent::new(now, ReplayEventKind::Damage)
                .source(&boss_id)
                .target(&hero_id)
                .amount(tick)
                .label("poison"),
        );
        if died {
            push_event(
                run,
                ReplayEvent::new(now, ReplayEventKind::Death)
                    .source(&boss_id)
                    .target(&hero_id),
            );
            clear_hero_threat(run, &hero_id);
            any_died = true;
        }
    }
    if any_died {
        run.target_hero_id = resolve_target_hero_id(run);
    }
}

fn summon_adds(run: &mut DungeonRunState, definition: &DungeonDefinition) {
    let living_adds = run
        .enemies
        .iter()
        .filter(|e| e.is_add && e.is_alive())
        .count();
    let hp = (resolve_mob_hp(run.tier, run.floor) * BOSS_SUMMON_HP_RATIO).round() as i64;
    let damage = resolve_mob_damage(run.tier, run.floor).round() as i64;
    for _ in living_adds..BOSS_SUMMON_MAX_ADDS {
        let name = if definition.mob_names.is_empty() {
            "Add".to_string()
        } else {
            let pick = run.next_spawn_index as usize % definition.mob_names.len();
            definition.mob_names[pick].clone()
        };
        spawn_enemy(run, &name, hp, damage, None);
        if let Some(add) = run.enemies.last_mut() {
            add.is_add = true;
        }
    }
}

/// Index of the hero the wave is attacking, re-resolving a stale lock.
fn current_target_hero(run: &mut DungeonRunState) -> Option<usize> {
    let valid = run
        .target_hero_id
        .as_deref()
        .and_then(|id| run.party.iter().position(|h| h.player_id == id && h.is_alive()));
    if valid.is_some() {
        return valid;
    }
    run.target_hero_id = resolve_target_hero_id(run);
    let id = run.target_hero_id.as_deref()?;
    run.party.iter().position(|h| h.player_id == id)
}

fn enemy_attack_phase(run: &mut DungeonRunState) {
    let now = run.elapsed_ms;
    run.target_hero_id = resolve_target_hero_id(run);

    for index in 0..run.enemies.len() {
        if !run.enemies[index].is_alive() {
            continue;
        }
        let mut attacks = 0;
        while run.enemies[index].attack_cooldown_ms <= 0 && attacks < DUNGEON_ATTACKS_PER_STEP_CAP {
            let Some(hero_index) = current_target_hero(run) else {
                break;
            };

            let enemy = &mut run.enemies[index];
            enemy.attack_cooldown_ms += enemy.attack_interval_ms.max(1);
            enemy.attack_count += 1;
            attacks += 1;
            let mut raw = enemy.damage as f64;
            let burst = enemy.mechanic == Some(BossMechanic::Burst)
                && enemy.attack_count % BOSS_BURST_EVERY_ATTACKS == 0;
            if burst {
                raw *= BOSS_BURST_MULTIPLIER;
            }
            if enemy.enraged {
                raw *= BOSS_ENRAGE_MULTIPLIER;
            }
            let enemy_id = enemy.id.clone();

            let hero = &mut run.party[hero_index];
            let dealt =
                mitigate_incoming_damage(raw, hero.weapon_type, f64::from(hero.armor)).min(hero.hp);
            hero.hp -= dealt;
            if burst {
                hero.stun_until_ms = now + BOSS_BURST_STUN_MS;
            }
            let hero_id = hero.player_id.clone();
            let died = !hero.is_alive();

            push_event(
                run,
                ReplayEvent::new(now, ReplayEventKind::Attack)
                    .source(&enemy_id)
                    .target(&hero_id),
            );
            let mut damage_event = ReplayEvent::new(now, ReplayEventKind::Damage)
                .source(&enemy_id)
                .target(&hero_id)
                .amount(dealt);
            if burst {
                damage_event = damage_event.label("burst");
            }
            push_event(run, damage_event);

            if died {
                push_event(
                    run,
                    ReplayEvent::new(now, ReplayEventKind::Death)
                        .source(&enemy_id)
                        .target(&hero_id),
                );
                clear_hero_threat(run, &hero_id);
                run.target_hero_id = resolve_target_hero_id(run);
            }
        }
        if attacks >= DUNGEON_ATTACKS_PER_STEP_CAP && run.enemies[index].attack_cooldown_ms <= 0 {
            run.enemies[index].attack_cooldown_ms = 0;
        }
    }
}

/// Magic heroes heal the living ally with the lowest HP ratio under the trigger.
fn heal_phase(run: &mut DungeonRunState) {
    let now = run.elapsed_ms;
    for healer in 0..run.party.len() {
        let caster = &run.party[healer];
        if !caster.is_alive()
            || caster.weapon_type != WeaponType::Magic
            || caster.heal_cooldown_ms > 0
            || caster.heal_amount <= 0
        {
            continue;
        }
        let amount = caster.heal_amount;
        let healer_id = caster.player_id.clone();

        let target = run
            .party
            .iter()
            .enumerate()
            .filter(|(_, ally)| ally.is_alive() && ally.hp_ratio() < HEAL_TRIGGER_RATIO)
            .min_by(|(ia, a), (ib, b)| a.hp_ratio().total_cmp(&b.hp_ratio()).then(ia.cmp(ib)))
            .map(|(i, _)| i);
        let Some(target) = target else {
            continue;
        };

        let ally = &mut run.party[target];
        let healed = amount.min(ally.hp_max - ally.hp);
        ally.hp += healed;
        let ally_id = ally.player_id.clone();
        run.party[healer].heal_cooldown_ms = HEAL_COOLDOWN_MS;

        add_threat(run, &healer_id, healed as f64 * HEAL_THREAT_PER_HP);
        push_event(
            run,
            ReplayEvent::new(now, ReplayEventKind::Heal)
                .source(&healer_id)
                .target(&ally_id)
                .amount(healed),
        );
    }
}

/// Heroes under the potion threshold drink the best potion in stock.
fn potion_phase(run: &mut DungeonRunState, inventory: &mut Inventory, delta: &mut ItemDelta) {
    let now = run.elapsed_ms;
    for index in 0..run.party.len() {
        let hero = &run.party[index];
        if !hero.is_alive() || hero.hp_ratio() >= POTION_TRIGGER_RATIO || hero.potion_cooldown_ms > 0
        {
            continue;
        }
        let Some(&(potion_id, restore_ratio)) =
            POTION_PRIORITY.iter().find(|(id, _)| inventory.has(id, 1))
        else {
            continue;
        };
        inventory.apply(potion_id, -1, delta);

        let hero = &mut run.party[index];
        let restore = ((hero.hp_max as f64 * restore_ratio).round() as i64).max(1);
        let healed = restore.min(hero.hp_max - hero.hp);
        hero.hp += healed;
        hero.potion_cooldown_ms = POTION_COOLDOWN_MS;
        let hero_id = hero.player_id.clone();

        push_event(
            run,
            ReplayEvent::new(now, ReplayEventKind::Heal)
                .source(&hero_id)
                .target(&hero_id)
                .amount(healed)
                .label(potion_id),
        );
    }
}
