// Simulation clock
pub const DUNGEON_SIMULATION_STEP_MS: i64 = 500;
pub const DUNGEON_ATTACKS_PER_STEP_CAP: u32 = 2;
pub const DUNGEON_FLOOR_PAUSE_MS: i64 = 1_000;
pub const DUNGEON_AUTO_RESTART_DELAY_MS: i64 = 3_000;

// Event log caps
pub const DUNGEON_STEP_EVENT_CAP: u32 = 24;
pub const DUNGEON_TOTAL_EVENT_CAP: u32 = 4_000;
pub const DUNGEON_REPLAY_MAX_EVENTS: usize = 2_000;
pub const DUNGEON_REPLAY_MAX_BYTES: usize = 256 * 1024;

// Party and run bookkeeping
pub const DUNGEON_PARTY_SIZE: usize = 4;
pub const DUNGEON_RUN_HISTORY_LIMIT: usize = 5;
pub const DUNGEON_MAX_SUPPORTED_CONCURRENT_RUNS: usize = 3;
pub const DUNGEON_MAX_ENABLED_CONCURRENT_RUNS: usize = 1;

// Hero attack cadence
pub const HERO_BASE_ATTACK_MS: f64 = 1_000.0;
pub const HERO_MIN_ATTACK_MS: f64 = 200.0;
pub const HERO_MAX_ATTACK_MS: f64 = 3_000.0;
pub const HERO_AGILITY_SPEED_FACTOR: f64 = 0.02;
pub const MELEE_INTERVAL_MULTIPLIER: f64 = 1.0;
pub const RANGED_INTERVAL_MULTIPLIER: f64 = 0.85;
pub const MAGIC_INTERVAL_MULTIPLIER: f64 = 1.1;

// Hero damage: 10 + level * 1.6 + strength * 1.2
pub const HERO_BASE_DAMAGE: f64 = 10.0;
pub const HERO_DAMAGE_PER_LEVEL: f64 = 1.6;
pub const HERO_DAMAGE_PER_STRENGTH: f64 = 1.2;

// Hero vitals: 100 + level * 8 + stamina * 5
pub const HERO_BASE_HP: f64 = 100.0;
pub const HERO_HP_PER_LEVEL: f64 = 8.0;
pub const HERO_HP_PER_STAMINA: f64 = 5.0;

// Mitigation
pub const ARMOR_REDUCTION_CONSTANT: f64 = 100.0;
pub const ARMOR_MAX_REDUCTION: f64 = 0.6;
pub const MELEE_DAMAGE_TAKEN_MULTIPLIER: f64 = 1.0;
pub const RANGED_DAMAGE_TAKEN_MULTIPLIER: f64 = 1.1;
pub const MAGIC_DAMAGE_TAKEN_MULTIPLIER: f64 = 1.15;

// Threat
pub const MELEE_THREAT_MULTIPLIER: f64 = 1.5;
pub const RANGED_THREAT_MULTIPLIER: f64 = 1.0;
pub const MAGIC_THREAT_MULTIPLIER: f64 = 0.9;
pub const THREAT_DECAY_PER_STEP: f64 = 0.97;
pub const STICKY_THRESHOLD_TRASH: f64 = 0.10;
pub const STICKY_THRESHOLD_BOSS: f64 = 0.25;
pub const HEAL_THREAT_PER_HP: f64 = 0.5;

// Taunt (melee heroes)
pub const TAUNT_DURATION_MS: i64 = 2_000;
pub const TAUNT_COOLDOWN_MS: i64 = 12_000;
pub const TAUNT_BASE_BONUS: f64 = 40.0;
pub const TAUNT_BONUS_PER_LEVEL: f64 = 2.0;

// Support (magic heroes and consumables)
pub const HEAL_TRIGGER_RATIO: f64 = 0.6;
pub const HEAL_COOLDOWN_MS: i64 = 4_000;
pub const HEAL_BASE_AMOUNT: f64 = 12.0;
pub const HEAL_PER_LEVEL: f64 = 1.2;
pub const HEAL_PER_INTELLECT: f64 = 1.5;
pub const POTION_TRIGGER_RATIO: f64 = 0.5;
pub const POTION_COOLDOWN_MS: i64 = 8_000;

// Enemy scaling
pub const ENEMY_ATTACK_INTERVAL_MS: i64 = 1_800;
pub const BOSS_ATTACK_INTERVAL_MS: i64 = 1_500;
pub const MOB_BASE_HP: f64 = 60.0;
pub const MOB_HP_TIER_GROWTH: f64 = 1.35;
pub const MOB_HP_FLOOR_GROWTH: f64 = 1.12;
pub const MOB_BASE_DAMAGE: f64 = 6.0;
pub const MOB_DAMAGE_TIER_GROWTH: f64 = 1.30;
pub const MOB_DAMAGE_FLOOR_GROWTH: f64 = 1.08;
pub const MOB_VARIANCE: f64 = 0.10;
pub const MOB_MIN_WAVE: u32 = 1;
pub const MOB_MAX_WAVE: u32 = 3;
pub const BOSS_HP_MULTIPLIER: f64 = 5.0;
pub const BOSS_DAMAGE_MULTIPLIER: f64 = 1.6;

// Boss mechanics
pub const BOSS_SHIELD_INTERVAL_MS: i64 = 10_000;
pub const BOSS_SHIELD_DURATION_MS: i64 = 3_000;
pub const BOSS_SHIELD_DAMAGE_REDUCTION: f64 = 0.6;
pub const BOSS_BURST_EVERY_ATTACKS: u32 = 3;
pub const BOSS_BURST_MULTIPLIER: f64 = 2.0;
pub const BOSS_BURST_STUN_MS: i64 = 1_000;
pub const BOSS_ENRAGE_HP_RATIO: f64 = 0.3;
pub const BOSS_ENRAGE_MULTIPLIER: f64 = 1.5;
pub const BOSS_POISON_INTERVAL_MS: i64 = 5_000;
pub const BOSS_POISON_HP_RATIO: f64 = 0.05;
pub const BOSS_SUMMON_INTERVAL_MS: i64 = 12_000;
pub const BOSS_SUMMON_MAX_ADDS: usize = 2;
pub const BOSS_SUMMON_HP_RATIO: f64 = 0.6;

// Rewards
pub const COMBAT_XP_BASE: f64 = 10.0;
pub const COMBAT_XP_PER_TIER: f64 = 8.0;
pub const COMBAT_XP_FLOOR_FACTOR: f64 = 0.15;
pub const BOSS_XP_MULTIPLIER: u64 = 2;
pub const VICTORY_GOLD_BASE: i64 = 25;
pub const VICTORY_GOLD_PER_TIER: i64 = 15;
pub const VICTORY_GOLD_PER_FLOOR: i64 = 2;

// Food
pub const FOOD_BASE_COST: i64 = 1;
pub const FOOD_TIER_STEP: u32 = 2;
pub const FOOD_FLOOR_STEP: u32 = 5;
pub const FOOD_BOSS_SURCHARGE: i64 = 2;

// Skill curve (shared by combat and gathering skills)
pub const SKILL_XP_NEXT_START: u64 = 100;
pub const SKILL_XP_GROWTH: f64 = 1.15;
pub const SKILL_MAX_LEVEL: u32 = 99;

// Offline catch-up
pub const DUNGEON_OFFLINE_MAX_MS: i64 = 12 * 60 * 60 * 1_000;
pub const DUNGEON_OFFLINE_TICK_MS: i64 = 60_000;

// Item ids the engine reads and writes
pub const FOOD_ITEM_ID: &str = "food";
pub const GOLD_ITEM_ID: &str = "gold";
/// Potions in consumption priority order with the share of hpMax they restore.
pub const POTION_PRIORITY: [(&str, f64); 3] = [
    ("potion_major", 0.60),
    ("potion", 0.35),
    ("potion_minor", 0.20),
];
