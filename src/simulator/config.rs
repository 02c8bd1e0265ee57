//! Simulation configuration.

/// Configuration for a batch of simulated expeditions.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Dungeon every expedition runs in
    pub dungeon_id: String,

    /// Number of independent expeditions to simulate
    pub num_runs: u32,

    /// Base seed for run ids, and therefore for every wave and loot roll
    /// (None = random)
    pub seed: Option<u64>,

    /// Simulated time per expedition
    pub duration_ms: i64,

    /// Size of each tick handed to the engine
    pub tick_ms: i64,

    /// Combat skill level of every sample hero
    pub hero_level: u32,

    /// Value of every base attribute of every sample hero
    pub hero_attribute: u32,

    /// Armor of every sample hero
    pub hero_armor: u32,

    /// Starting food stock
    pub food: i64,

    /// Starting stock of each potion grade
    pub potions: i64,

    /// Restart automatically after a victory
    pub auto_restart: bool,

    /// Let heroes drink potions
    pub auto_consumables: bool,

    /// Log verbosity (0 = silent, 1 = summary, 2 = per expedition)
    pub verbosity: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dungeon_id: "goblin_warren".to_string(),
            num_runs: 100,
            seed: None,
            duration_ms: 60 * 60 * 1_000,
            tick_ms: 1_000,
            hero_level: 1,
            hero_attribute: 5,
            hero_armor: 0,
            food: 200,
            potions: 10,
            auto_restart: true,
            auto_consumables: true,
            verbosity: 1,
        }
    }
}

impl SimConfig {
    /// A single clear attempt with restarts off
    pub fn single_clear(dungeon_id: &str) -> Self {
        Self {
            dungeon_id: dungeon_id.to_string(),
            num_runs: 50,
            duration_ms: 30 * 60 * 1_000,
            auto_restart: false,
            ..Default::default()
        }
    }

    /// A long idle session, ticked in offline-sized chunks
    pub fn idle_session(dungeon_id: &str, hours: i64) -> Self {
        Self {
            dungeon_id: dungeon_id.to_string(),
            num_runs: 20,
            duration_ms: hours * 60 * 60 * 1_000,
            tick_ms: 60_000,
            food: 2_000,
            potions: 50,
            ..Default::default()
        }
    }

    /// Veteran heroes, for checking the upper dungeon tiers
    pub fn veteran(dungeon_id: &str) -> Self {
        Self {
            dungeon_id: dungeon_id.to_string(),
            hero_level: 30,
            hero_attribute: 25,
            hero_armor: 60,
            food: 1_000,
            potions: 40,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_keep_defaults_they_do_not_override() {
        let clear = SimConfig::single_clear("howling_den");
        assert_eq!(clear.dungeon_id, "howling_den");
        assert!(!clear.auto_restart);
        assert_eq!(clear.tick_ms, SimConfig::default().tick_ms);

        let idle = SimConfig::idle_session("goblin_warren", 8);
        assert_eq!(idle.duration_ms, 8 * 3_600_000);
        assert!(idle.auto_restart);
    }
}
