//! Shared combat and balance math.
//!
//! Pure functions with no state. Inputs that are not finite (or negative
//! where that makes no sense) are normalized to safe defaults instead of
//! propagating NaN into the simulation.

use super::constants::*;
use crate::character::WeaponType;

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

fn non_negative(value: f64) -> f64 {
    finite_or(value, 0.0).max(0.0)
}

/// Cadence multiplier per weapon family. Ranged attacks come out faster.
pub fn resolve_weapon_interval_multiplier(weapon_type: WeaponType) -> f64 {
    match weapon_type {
        WeaponType::Melee => MELEE_INTERVAL_MULTIPLIER,
        WeaponType::Ranged => RANGED_INTERVAL_MULTIPLIER,
        WeaponType::Magic => MAGIC_INTERVAL_MULTIPLIER,
    }
}

/// Milliseconds between two hero attacks.
///
/// `base_ms / (1 + agility * 0.02)`, scaled by the weapon multiplier, then
/// clamped to `[HERO_MIN_ATTACK_MS, HERO_MAX_ATTACK_MS]`.
pub fn resolve_hero_attack_interval_ms(base_ms: f64, agility: f64, weapon_type: WeaponType) -> i64 {
    let base = finite_or(base_ms, HERO_BASE_ATTACK_MS);
    let base = if base > 0.0 { base } else { HERO_BASE_ATTACK_MS };
    let agility = non_negative(agility);
    let interval = base / (1.0 + agility * HERO_AGILITY_SPEED_FACTOR)
        * resolve_weapon_interval_multiplier(weapon_type);
    interval
        .clamp(HERO_MIN_ATTACK_MS, HERO_MAX_ATTACK_MS)
        .round() as i64
}

/// Damage of one hero attack: `max(1, round(10 + level * 1.6 + strength * 1.2))`.
pub fn resolve_hero_attack_damage(combat_level: f64, strength: f64) -> i64 {
    let raw = HERO_BASE_DAMAGE
        + non_negative(combat_level) * HERO_DAMAGE_PER_LEVEL
        + non_negative(strength) * HERO_DAMAGE_PER_STRENGTH;
    (raw.round() as i64).max(1)
}

pub fn resolve_hero_max_hp(combat_level: f64, stamina: f64) -> i64 {
    let raw = HERO_BASE_HP
        + non_negative(combat_level) * HERO_HP_PER_LEVEL
        + non_negative(stamina) * HERO_HP_PER_STAMINA;
    (raw.round() as i64).max(1)
}

pub fn resolve_heal_amount(combat_level: f64, intellect: f64) -> i64 {
    let raw = HEAL_BASE_AMOUNT
        + non_negative(combat_level) * HEAL_PER_LEVEL
        + non_negative(intellect) * HEAL_PER_INTELLECT;
    (raw.round() as i64).max(1)
}

/// Incoming damage scalar from armor. Diminishing returns, reduction capped
/// at [`ARMOR_MAX_REDUCTION`], never below zero.
pub fn resolve_armor_damage_multiplier(armor: f64) -> f64 {
    let armor = non_negative(armor);
    let reduction = (armor / (armor + ARMOR_REDUCTION_CONSTANT)).min(ARMOR_MAX_REDUCTION);
    (1.0 - reduction).max(0.0)
}

/// Incoming damage scalar per weapon family. Backliners take more.
pub fn resolve_damage_taken_multiplier(weapon_type: WeaponType) -> f64 {
    match weapon_type {
        WeaponType::Melee => MELEE_DAMAGE_TAKEN_MULTIPLIER,
        WeaponType::Ranged => RANGED_DAMAGE_TAKEN_MULTIPLIER,
        WeaponType::Magic => MAGIC_DAMAGE_TAKEN_MULTIPLIER,
    }
}

/// Threat generated per point of damage. Melee holds aggro best.
pub fn resolve_threat_multiplier(weapon_type: WeaponType) -> f64 {
    match weapon_type {
        WeaponType::Melee => MELEE_THREAT_MULTIPLIER,
        WeaponType::Ranged => RANGED_THREAT_MULTIPLIER,
        WeaponType::Magic => MAGIC_THREAT_MULTIPLIER,
    }
}

pub fn resolve_taunt_bonus(combat_level: f64) -> f64 {
    TAUNT_BASE_BONUS + non_negative(combat_level) * TAUNT_BONUS_PER_LEVEL
}

/// Damage that actually lands on a hero after weapon-type and armor scaling.
/// Any positive hit deals at least 1.
pub fn mitigate_incoming_damage(raw: f64, weapon_type: WeaponType, armor: f64) -> i64 {
    let raw = non_negative(raw);
    if raw <= 0.0 {
        return 0;
    }
    let scaled = raw
        * resolve_damage_taken_multiplier(weapon_type)
        * resolve_armor_damage_multiplier(armor);
    (scaled.round() as i64).max(1)
}

fn tier_floor_curve(base: f64, tier_growth: f64, floor_growth: f64, tier: u32, floor: u32) -> f64 {
    let tier_steps = tier.max(1) - 1;
    let floor_steps = floor.max(1) - 1;
    base * tier_growth.powi(tier_steps as i32) * floor_growth.powi(floor_steps as i32)
}

/// Trash mob HP before variance.
pub fn resolve_mob_hp(tier: u32, floor: u32) -> f64 {
    tier_floor_curve(MOB_BASE_HP, MOB_HP_TIER_GROWTH, MOB_HP_FLOOR_GROWTH, tier, floor)
}

/// Trash mob damage per hit before variance.
pub fn resolve_mob_damage(tier: u32, floor: u32) -> f64 {
    tier_floor_curve(
        MOB_BASE_DAMAGE,
        MOB_DAMAGE_TIER_GROWTH,
        MOB_DAMAGE_FLOOR_GROWTH,
        tier,
        floor,
    )
}

/// Food consumed when a floor starts.
///
/// Grows by one every [`FOOD_TIER_STEP`] tiers and every [`FOOD_FLOOR_STEP`]
/// floors; the final (boss) floor costs [`FOOD_BOSS_SURCHARGE`] extra.
pub fn food_cost_for_floor(tier: u32, floor: u32, floor_count: u32) -> i64 {
    let tier_steps = (tier.max(1) - 1) / FOOD_TIER_STEP;
    let floor_steps = (floor.max(1) - 1) / FOOD_FLOOR_STEP;
    let surcharge = if floor >= floor_count.max(1) {
        FOOD_BOSS_SURCHARGE
    } else {
        0
    };
    FOOD_BASE_COST + i64::from(tier_steps) + i64::from(floor_steps) + surcharge
}

/// Combat XP granted to each living hero when a wave is cleared.
pub fn combat_xp_for_wave(tier: u32, floor: u32, is_boss_floor: bool) -> u64 {
    let base = (COMBAT_XP_BASE + COMBAT_XP_PER_TIER * f64::from(tier.max(1)))
        * (1.0 + COMBAT_XP_FLOOR_FACTOR * f64::from(floor.max(1)));
    let xp = base.round() as u64;
    if is_boss_floor {
        xp * BOSS_XP_MULTIPLIER
    } else {
        xp
    }
}

/// Gold paid out on dungeon victory.
pub fn victory_gold(tier: u32, floor_count: u32) -> i64 {
    VICTORY_GOLD_BASE
        + VICTORY_GOLD_PER_TIER * i64::from(tier.max(1))
        + VICTORY_GOLD_PER_FLOOR * i64::from(floor_count)
}
