//! Dungeon run data structures.

use super::definitions::BossMechanic;
use super::loot::LootReward;
use super::replay::{DungeonReplayState, ReplayEvent};
use crate::character::WeaponType;
use crate::core::constants::{
    DUNGEON_MAX_ENABLED_CONCURRENT_RUNS, DUNGEON_MAX_SUPPORTED_CONCURRENT_RUNS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    Victory,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndReason {
    Victory,
    Wipe,
    OutOfFood,
    Stopped,
}

impl RunEndReason {
    /// Label used in journal lines.
    pub fn label(&self) -> &'static str {
        match self {
            RunEndReason::Victory => "Victory",
            RunEndReason::Wipe => "Wipe",
            RunEndReason::OutOfFood => "Out of food",
            RunEndReason::Stopped => "Stopped",
        }
    }
}

/// One hero's combat record inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroCombatState {
    pub player_id: String,
    pub name: String,
    #[serde(default)]
    pub weapon_type: WeaponType,
    #[serde(default)]
    pub armor: u32,
    #[serde(default = "default_level")]
    pub combat_level: u32,
    pub hp: i64,
    pub hp_max: i64,
    #[serde(default)]
    pub attack_damage: i64,
    #[serde(default)]
    pub attack_interval_ms: i64,
    #[serde(default)]
    pub heal_amount: i64,
    #[serde(default)]
    pub attack_cooldown_ms: i64,
    #[serde(default)]
    pub heal_cooldown_ms: i64,
    #[serde(default)]
    pub potion_cooldown_ms: i64,
    #[serde(default)]
    pub taunt_cooldown_ms: i64,
    /// Run-relative end of the active taunt window; 0 when not taunting.
    #[serde(default)]
    pub taunt_until_ms: i64,
    #[serde(default)]
    pub taunt_bonus: f64,
    #[serde(default)]
    pub stun_until_ms: i64,
}

fn default_level() -> u32 {
    1
}

impl HeroCombatState {
    /// Fresh record at full HP with every cooldown ready.
    pub fn new(player_id: &str, name: &str, weapon_type: WeaponType, hp_max: i64) -> Self {
        Self {
            player_id: player_id.to_string(),
            name: name.to_string(),
            weapon_type,
            armor: 0,
            combat_level: 1,
            hp: hp_max,
            hp_max,
            attack_damage: 1,
            attack_interval_ms: 1_000,
            heal_amount: 0,
            attack_cooldown_ms: 0,
            heal_cooldown_ms: 0,
            potion_cooldown_ms: 0,
            taunt_cooldown_ms: 0,
            taunt_until_ms: 0,
            taunt_bonus: 0.0,
            stun_until_ms: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.hp_max <= 0 {
            return 0.0;
        }
        self.hp as f64 / self.hp_max as f64
    }

    pub fn is_taunting(&self, now_ms: i64) -> bool {
        self.taunt_until_ms > now_ms
    }

    pub fn is_stunned(&self, now_ms: i64) -> bool {
        self.stun_until_ms > now_ms
    }

    pub fn clear_taunt(&mut self) {
        self.taunt_until_ms = 0;
        self.taunt_bonus = 0.0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    pub id: String,
    pub name: String,
    pub hp: i64,
    pub hp_max: i64,
    pub damage: i64,
    pub is_boss: bool,
    #[serde(default)]
    pub mechanic: Option<BossMechanic>,
    pub spawn_index: u32,
    #[serde(default)]
    pub attack_interval_ms: i64,
    #[serde(default)]
    pub attack_cooldown_ms: i64,
    #[serde(default)]
    pub mechanic_cooldown_ms: i64,
    #[serde(default)]
    pub attack_count: u32,
    #[serde(default)]
    pub shield_until_ms: i64,
    #[serde(default)]
    pub enraged: bool,
    /// Summoned by the boss mid-fight.
    #[serde(default)]
    pub is_add: bool,
}

impl EnemyState {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.hp_max <= 0 {
            return 0.0;
        }
        self.hp as f64 / self.hp_max as f64
    }

    pub fn is_shielded(&self, now_ms: i64) -> bool {
        self.shield_until_ms > now_ms
    }
}

/// A hero's attack-interval inputs captured when the run (re)starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroCadence {
    pub player_id: String,
    pub agility: u32,
    pub weapon_type: WeaponType,
    pub base_interval_ms: f64,
    pub attack_interval_ms: i64,
    pub attack_damage: i64,
}

/// One expedition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonRunState {
    pub id: String,
    pub dungeon_id: String,
    pub seed: u64,
    #[serde(default)]
    pub run_index: u32,

    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub end_reason: Option<RunEndReason>,
    /// Absolute time (same clock as `clock_ms`) at which an auto-restart fires.
    #[serde(default)]
    pub restart_at: Option<i64>,

    /// Wall-clock ms when the run was created.
    #[serde(default)]
    pub started_at: i64,
    /// Absolute time the run has been simulated up to.
    #[serde(default)]
    pub clock_ms: i64,

    pub floor: u32,
    pub floor_count: u32,
    #[serde(default = "default_tier")]
    pub tier: u32,
    #[serde(default)]
    pub encounter_step: u64,
    #[serde(default)]
    pub elapsed_ms: i64,
    /// Leftover time below one whole step.
    #[serde(default)]
    pub step_carry_ms: i64,
    /// Remaining inter-floor pause.
    #[serde(default)]
    pub floor_pause_ms: i64,

    pub party: Vec<HeroCombatState>,
    #[serde(default)]
    pub enemies: Vec<EnemyState>,
    #[serde(default)]
    pub next_spawn_index: u32,

    #[serde(default)]
    pub target_enemy_id: Option<String>,
    #[serde(default)]
    pub target_hero_id: Option<String>,

    #[serde(default)]
    pub threat_by_hero_id: BTreeMap<String, f64>,
    #[serde(default)]
    pub threat_tie_order: Vec<String>,

    #[serde(default)]
    pub events: Vec<ReplayEvent>,
    /// Non-critical events dropped by either cap.
    #[serde(default)]
    pub truncated_events: u32,
    /// Non-critical events kept over the run's lifetime.
    #[serde(default)]
    pub non_critical_event_count: u32,
    /// Non-critical events kept in the step being simulated.
    #[serde(skip)]
    pub step_event_count: u32,

    #[serde(default)]
    pub cadence: Vec<HeroCadence>,
    #[serde(default)]
    pub starting_inventory: BTreeMap<String, i64>,
    /// Loot rolled on the most recent victory.
    #[serde(default)]
    pub loot: Option<LootReward>,
}

fn default_tier() -> u32 {
    1
}

impl DungeonRunState {
    /// Running, or finished and waiting for an auto-restart.
    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Running || self.restart_at.is_some()
    }

    pub fn is_boss_floor(&self) -> bool {
        self.floor >= self.floor_count
    }

    pub fn hero(&self, player_id: &str) -> Option<&HeroCombatState> {
        self.party.iter().find(|h| h.player_id == player_id)
    }

    pub fn hero_mut(&mut self, player_id: &str) -> Option<&mut HeroCombatState> {
        self.party.iter_mut().find(|h| h.player_id == player_id)
    }

    pub fn enemy(&self, enemy_id: &str) -> Option<&EnemyState> {
        self.enemies.iter().find(|e| e.id == enemy_id)
    }

    pub fn any_hero_alive(&self) -> bool {
        self.party.iter().any(HeroCombatState::is_alive)
    }

    pub fn any_enemy_alive(&self) -> bool {
        self.enemies.iter().any(EnemyState::is_alive)
    }

    pub fn boss_alive(&self) -> bool {
        self.enemies.iter().any(|e| e.is_boss && e.is_alive())
    }

    pub fn threat(&self, player_id: &str) -> f64 {
        self.threat_by_hero_id.get(player_id).copied().unwrap_or(0.0)
    }

    /// Position in the seed-derived tie order; unknown ids sort last.
    pub fn tie_rank(&self, player_id: &str) -> usize {
        self.threat_tie_order
            .iter()
            .position(|id| id == player_id)
            .unwrap_or(usize::MAX)
    }

    #[cfg(test)]
    pub(crate) fn empty_for_test() -> Self {
        Self {
            id: "run-test".to_string(),
            dungeon_id: "goblin_warren".to_string(),
            seed: 1,
            run_index: 0,
            status: RunStatus::Running,
            end_reason: None,
            restart_at: None,
            started_at: 0,
            clock_ms: 0,
            floor: 1,
            floor_count: 10,
            tier: 1,
            encounter_step: 0,
            elapsed_ms: 0,
            step_carry_ms: 0,
            floor_pause_ms: 0,
            party: Vec::new(),
            enemies: Vec::new(),
            next_spawn_index: 0,
            target_enemy_id: None,
            target_hero_id: None,
            threat_by_hero_id: BTreeMap::new(),
            threat_tie_order: Vec::new(),
            events: Vec::new(),
            truncated_events: 0,
            non_critical_event_count: 0,
            step_event_count: 0,
            cadence: Vec::new(),
            starting_inventory: BTreeMap::new(),
            loot: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonSetup {
    #[serde(default)]
    pub selected_dungeon_id: Option<String>,
    #[serde(default)]
    pub selected_hero_ids: Vec<String>,
    #[serde(default)]
    pub auto_restart: bool,
    #[serde(default)]
    pub auto_consumables: bool,
}

/// Concurrency policy. Several runs are supported by the data model; only
/// `max_enabled_concurrent_runs` may be live at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonPolicy {
    pub max_supported_concurrent_runs: usize,
    pub max_enabled_concurrent_runs: usize,
}

impl Default for DungeonPolicy {
    fn default() -> Self {
        Self {
            max_supported_concurrent_runs: DUNGEON_MAX_SUPPORTED_CONCURRENT_RUNS,
            max_enabled_concurrent_runs: DUNGEON_MAX_ENABLED_CONCURRENT_RUNS,
        }
    }
}

/// Human-readable line for the action journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub at_ms: i64,
    pub text: String,
}

/// Persisted dungeon aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonState {
    #[serde(default = "default_onboarding")]
    pub onboarding_required: bool,
    #[serde(default)]
    pub setup: DungeonSetup,
    #[serde(default)]
    pub runs: BTreeMap<String, DungeonRunState>,
    #[serde(default)]
    pub active_run_id: Option<String>,
    #[serde(default)]
    pub latest_replay: Option<DungeonReplayState>,
    #[serde(default)]
    pub completion_counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub policy: DungeonPolicy,
}

fn default_onboarding() -> bool {
    true
}

impl Default for DungeonState {
    fn default() -> Self {
        Self {
            onboarding_required: true,
            setup: DungeonSetup::default(),
            runs: BTreeMap::new(),
            active_run_id: None,
            latest_replay: None,
            completion_counts: BTreeMap::new(),
            policy: DungeonPolicy::default(),
        }
    }
}

impl DungeonState {
    pub fn active_runs(&self) -> impl Iterator<Item = &DungeonRunState> {
        self.runs.values().filter(|r| r.is_active())
    }

    pub fn active_run_count(&self) -> usize {
        self.active_runs().count()
    }

    pub fn active_run(&self) -> Option<&DungeonRunState> {
        self.active_run_id.as_ref().and_then(|id| self.runs.get(id))
    }

    /// True when the hero fights in any active run.
    pub fn is_hero_busy(&self, player_id: &str) -> bool {
        self.active_runs()
            .any(|run| run.party.iter().any(|h| h.player_id == player_id))
    }

    pub fn completions(&self, dungeon_id: &str) -> u32 {
        self.completion_counts.get(dungeon_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_active_while_running_or_awaiting_restart() {
        let mut run = DungeonRunState::empty_for_test();
        assert!(run.is_active());
        run.status = RunStatus::Victory;
        assert!(!run.is_active());
        run.restart_at = Some(1_000);
        assert!(run.is_active());
    }

    #[test]
    fn test_tie_rank_unknown_sorts_last() {
        let mut run = DungeonRunState::empty_for_test();
        run.threat_tie_order = vec!["b".to_string(), "a".to_string()];
        assert_eq!(run.tie_rank("b"), 0);
        assert_eq!(run.tie_rank("a"), 1);
        assert_eq!(run.tie_rank("zzz"), usize::MAX);
    }

    #[test]
    fn test_dungeon_state_defaults_from_empty_json() {
        let state: DungeonState = serde_json::from_str("{}").unwrap();
        assert!(state.onboarding_required);
        assert!(state.runs.is_empty());
        assert_eq!(state.policy.max_enabled_concurrent_runs, 1);
        assert_eq!(state.policy.max_supported_concurrent_runs, 3);
    }

    #[test]
    fn test_end_reason_labels() {
        assert_eq!(RunEndReason::OutOfFood.label(), "Out of food");
        assert_eq!(RunEndReason::Wipe.label(), "Wipe");
    }
}
