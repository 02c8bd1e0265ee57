//! Aggro table and target selection.
//!
//! Enemies pick a hero by taunt first, then by decaying threat with
//! sticky-target hysteresis. Heroes focus the weakest living enemy.

use super::types::DungeonRunState;
use crate::character::WeaponType;
use crate::core::combat_math::resolve_taunt_bonus;
use crate::core::constants::{
    STICKY_THRESHOLD_BOSS, STICKY_THRESHOLD_TRASH, TAUNT_COOLDOWN_MS, TAUNT_DURATION_MS,
    THREAT_DECAY_PER_STEP,
};
use crate::core::rng::seeded_rng;
use rand::seq::SliceRandom;

/// Seed-derived fixed ordering used to break threat and taunt ties.
pub fn build_threat_tie_order(seed: u64, hero_ids: &[String]) -> Vec<String> {
    let mut order = hero_ids.to_vec();
    order.shuffle(&mut seeded_rng(seed));
    order
}

/// Multiplies every threat score by the per-step decay factor.
pub fn decay_threat(run: &mut DungeonRunState) {
    for value in run.threat_by_hero_id.values_mut() {
        *value *= THREAT_DECAY_PER_STEP;
    }
}

pub fn add_threat(run: &mut DungeonRunState, player_id: &str, amount: f64) {
    if !amount.is_finite() || amount <= 0.0 {
        return;
    }
    *run.threat_by_hero_id
        .entry(player_id.to_string())
        .or_insert(0.0) += amount;
}

/// Drops a dead hero out of the aggro table and any lock onto them.
pub fn clear_hero_threat(run: &mut DungeonRunState, player_id: &str) {
    run.threat_by_hero_id.insert(player_id.to_string(), 0.0);
    if run.target_hero_id.as_deref() == Some(player_id) {
        run.target_hero_id = None;
    }
    if let Some(hero) = run.hero_mut(player_id) {
        hero.clear_taunt();
    }
}

/// Expires finished taunt windows and opens new ones.
///
/// A living melee hero with its taunt ready pulls aggro whenever the wave is
/// focused on someone else. The flat bonus is added once, when the window opens.
pub fn update_taunts(run: &mut DungeonRunState) {
    let now = run.elapsed_ms;
    for hero in run.party.iter_mut() {
        if hero.taunt_until_ms != 0 && !hero.is_taunting(now) {
            hero.clear_taunt();
        }
    }

    if !run.any_enemy_alive() {
        return;
    }
    let Some(current_target) = run.target_hero_id.clone() else {
        return;
    };

    let mut opened = Vec::new();
    for hero in run.party.iter_mut() {
        if !hero.is_alive()
            || hero.weapon_type != WeaponType::Melee
            || hero.taunt_cooldown_ms > 0
            || hero.player_id == current_target
        {
            continue;
        }
        let bonus = resolve_taunt_bonus(f64::from(hero.combat_level));
        hero.taunt_until_ms = now + TAUNT_DURATION_MS;
        hero.taunt_bonus = bonus;
        hero.taunt_cooldown_ms = TAUNT_COOLDOWN_MS;
        opened.push((hero.player_id.clone(), bonus));
    }
    for (player_id, bonus) in opened {
        add_threat(run, &player_id, bonus);
    }
}

fn outranks(a: (f64, usize), b: (f64, usize)) -> bool {
    a.0 > b.0 || (a.0 == b.0 && a.1 < b.1)
}

/// Picks the hero the enemy wave attacks. Does not store the result.
pub fn resolve_target_hero_id(run: &DungeonRunState) -> Option<String> {
    let now = run.elapsed_ms;
    let alive: Vec<_> = run.party.iter().filter(|h| h.is_alive()).collect();
    if alive.is_empty() {
        return None;
    }

    let mut best_taunt: Option<(&str, (f64, usize))> = None;
    for hero in alive.iter().filter(|h| h.is_taunting(now)) {
        let key = (hero.taunt_bonus, run.tie_rank(&hero.player_id));
        if best_taunt.map_or(true, |(_, best)| outranks(key, best)) {
            best_taunt = Some((&hero.player_id, key));
        }
    }
    if let Some((id, _)) = best_taunt {
        return Some(id.to_string());
    }

    let mut top: Option<(&str, (f64, usize))> = None;
    for hero in &alive {
        let key = (run.threat(&hero.player_id), run.tie_rank(&hero.player_id));
        if top.map_or(true, |(_, best)| outranks(key, best)) {
            top = Some((&hero.player_id, key));
        }
    }
    let (top_id, (top_threat, _)) = top?;

    let current = run
        .target_hero_id
        .as_deref()
        .filter(|id| alive.iter().any(|h| h.player_id == *id));
    let Some(current) = current else {
        return Some(top_id.to_string());
    };
    if current == top_id || top_threat <= 0.0 {
        return Some(current.to_string());
    }

    let threshold = if run.boss_alive() {
        STICKY_THRESHOLD_BOSS
    } else {
        STICKY_THRESHOLD_TRASH
    };
    if top_threat > run.threat(current) * (1.0 + threshold) {
        Some(top_id.to_string())
    } else {
        Some(current.to_string())
    }
}

/// Picks the enemy the party focuses: the current target while it lives,
/// otherwise the lowest-HP living enemy (earliest spawn on ties).
pub fn resolve_target_enemy_id(run: &DungeonRunState) -> Option<String> {
    if let Some(current) = run.target_enemy_id.as_deref() {
        if run.enemy(current).is_some_and(|e| e.is_alive()) {
            return Some(current.to_string());
        }
    }
    run.enemies
        .iter()
        .filter(|e| e.is_alive())
        .min_by_key(|e| (e.hp, e.spawn_index))
        .map(|e| e.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::types::{EnemyState, HeroCombatState};

    fn run_with_party() -> DungeonRunState {
        let mut run = DungeonRunState::empty_for_test();
        run.party = vec![
            HeroCombatState::new("tank", "Tank", WeaponType::Melee, 100),
            HeroCombatState::new("archer", "Archer", WeaponType::Ranged, 100),
            HeroCombatState::new("mage", "Mage", WeaponType::Magic, 100),
            HeroCombatState::new("rogue", "Rogue", WeaponType::Ranged, 100),
        ];
        run.threat_tie_order = vec![
            "mage".to_string(),
            "tank".to_string(),
            "archer".to_string(),
            "rogue".to_string(),
        ];
        run.enemies = vec![enemy("e0", 50, 0, false), enemy("e1", 30, 1, false)];
        run
    }

    fn enemy(id: &str, hp: i64, spawn_index: u32, is_boss: bool) -> EnemyState {
        EnemyState {
            id: id.to_string(),
            name: id.to_string(),
            hp,
            hp_max: 100,
            damage: 5,
            is_boss,
            mechanic: None,
            spawn_index,
            attack_interval_ms: 1_800,
            attack_cooldown_ms: 0,
            mechanic_cooldown_ms: 0,
            attack_count: 0,
            shield_until_ms: 0,
            enraged: false,
            is_add: false,
        }
    }

    #[test]
    fn test_tie_order_is_seeded_permutation() {
        let ids: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let first = build_threat_tie_order(77, &ids);
        assert_eq!(first, build_threat_tie_order(77, &ids));
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_zero_threat_falls_back_to_tie_order() {
        let run = run_with_party();
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("mage"));
    }

    #[test]
    fn test_highest_threat_wins_without_lock() {
        let mut run = run_with_party();
        add_threat(&mut run, "archer", 30.0);
        add_threat(&mut run, "tank", 10.0);
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("archer"));
    }

    #[test]
    fn test_sticky_target_needs_margin_to_switch() {
        let mut run = run_with_party();
        run.target_hero_id = Some("tank".to_string());
        add_threat(&mut run, "tank", 100.0);
        add_threat(&mut run, "archer", 109.0);
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("tank"));

        add_threat(&mut run, "archer", 2.0);
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("archer"));
    }

    #[test]
    fn test_boss_fights_use_larger_threshold() {
        let mut run = run_with_party();
        run.enemies = vec![enemy("boss", 400, 0, true)];
        run.target_hero_id = Some("tank".to_string());
        add_threat(&mut run, "tank", 100.0);
        add_threat(&mut run, "archer", 120.0);
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("tank"));
        add_threat(&mut run, "archer", 6.0);
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("archer"));
    }

    #[test]
    fn test_dead_lock_target_is_replaced() {
        let mut run = run_with_party();
        run.target_hero_id = Some("tank".to_string());
        add_threat(&mut run, "archer", 5.0);
        run.party[0].hp = 0;
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("archer"));
    }

    #[test]
    fn test_taunt_overrides_threat_and_breaks_ties_by_bonus_then_order() {
        let mut run = run_with_party();
        add_threat(&mut run, "archer", 1_000.0);
        run.elapsed_ms = 1_000;
        run.party[3].taunt_until_ms = 2_000;
        run.party[3].taunt_bonus = 40.0;
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("rogue"));

        run.party[0].taunt_until_ms = 2_000;
        run.party[0].taunt_bonus = 40.0;
        // equal bonus: tank comes before rogue in the tie order
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("tank"));

        run.party[3].taunt_bonus = 60.0;
        assert_eq!(resolve_target_hero_id(&run).as_deref(), Some("rogue"));
    }

    #[test]
    fn test_taunt_opens_once_and_expires() {
        let mut run = run_with_party();
        run.target_hero_id = Some("archer".to_string());
        update_taunts(&mut run);
        let tank = run.hero("tank").unwrap();
        assert_eq!(tank.taunt_until_ms, TAUNT_DURATION_MS);
        assert!(tank.taunt_bonus > 0.0);
        let threat_after_open = run.threat("tank");
        assert!(threat_after_open > 0.0);

        run.elapsed_ms = 500;
        update_taunts(&mut run);
        assert_eq!(run.threat("tank"), threat_after_open, "bonus is not re-added");

        run.elapsed_ms = TAUNT_DURATION_MS;
        update_taunts(&mut run);
        let tank = run.hero("tank").unwrap();
        assert_eq!(tank.taunt_until_ms, 0);
        assert_eq!(tank.taunt_bonus, 0.0);
    }

    #[test]
    fn test_no_taunt_when_already_targeted() {
        let mut run = run_with_party();
        run.target_hero_id = Some("tank".to_string());
        update_taunts(&mut run);
        assert_eq!(run.hero("tank").unwrap().taunt_until_ms, 0);
    }

    #[test]
    fn test_decay_is_multiplicative() {
        let mut run = run_with_party();
        add_threat(&mut run, "tank", 100.0);
        decay_threat(&mut run);
        assert!((run.threat("tank") - 100.0 * THREAT_DECAY_PER_STEP).abs() < 1e-9);
    }

    #[test]
    fn test_clear_hero_threat_releases_lock() {
        let mut run = run_with_party();
        add_threat(&mut run, "tank", 50.0);
        run.target_hero_id = Some("tank".to_string());
        clear_hero_threat(&mut run, "tank");
        assert_eq!(run.threat("tank"), 0.0);
        assert!(run.target_hero_id.is_none());
    }

    #[test]
    fn test_enemy_target_lowest_hp_then_spawn_order_and_sticky() {
        let mut run = run_with_party();
        assert_eq!(resolve_target_enemy_id(&run).as_deref(), Some("e1"));

        run.enemies[0].hp = 30;
        assert_eq!(resolve_target_enemy_id(&run).as_deref(), Some("e0"));

        run.target_enemy_id = Some("e1".to_string());
        run.enemies[0].hp = 1;
        assert_eq!(resolve_target_enemy_id(&run).as_deref(), Some("e1"), "locked");

        run.enemies[1].hp = 0;
        assert_eq!(resolve_target_enemy_id(&run).as_deref(), Some("e0"));

        run.enemies[0].hp = 0;
        assert_eq!(resolve_target_enemy_id(&run), None);
    }
}
