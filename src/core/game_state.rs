//! The save-state aggregate the dungeon engine reads and returns.

use crate::character::{PlayerId, PlayerState};
use crate::dungeon::types::DungeonState;
use crate::inventory::Inventory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub players: BTreeMap<PlayerId, PlayerState>,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub dungeon: DungeonState,
    /// Wall-clock ms of the last processed tick.
    #[serde(default)]
    pub last_tick: i64,
}

impl GameState {
    pub fn new(now_ms: i64) -> Self {
        Self {
            last_tick: now_ms,
            ..Self::default()
        }
    }

    /// Adds a hero to the roster, replacing any hero with the same id.
    pub fn add_player(&mut self, player: PlayerState) {
        self.players.insert(player.id.clone(), player);
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    /// Parses a persisted state and repairs anything an older save may have
    /// left malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut state: GameState = serde_json::from_str(json)?;
        crate::dungeon::normalize::normalize_game_state(&mut state);
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_loads_with_defaults() {
        let state = GameState::from_json("{}").unwrap();
        assert!(state.players.is_empty());
        assert!(state.dungeon.onboarding_required);
        assert_eq!(state.last_tick, 0);
    }

    #[test]
    fn test_add_player_replaces_same_id() {
        let mut state = GameState::new(10);
        state.add_player(PlayerState::new("p1", "Ayla"));
        state.add_player(PlayerState::new("p1", "Bryn"));
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.player("p1").unwrap().name, "Bryn");
    }
}
