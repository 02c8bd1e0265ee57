//! Skill XP curve shared by combat skills and the gathering/crafting skills
//! of the outer idle loop.

use super::constants::{SKILL_MAX_LEVEL, SKILL_XP_GROWTH, SKILL_XP_NEXT_START};
use serde::{Deserialize, Serialize};

/// Level and XP progress for one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub level: u32,
    /// XP accumulated toward the next level.
    pub xp: u64,
    /// XP required to reach the next level.
    pub xp_next: u64,
}

impl Default for SkillProgress {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            xp_next: SKILL_XP_NEXT_START,
        }
    }
}

impl SkillProgress {
    /// Adds XP and resolves level-ups. Returns the number of levels gained.
    pub fn add_xp(&mut self, amount: u64) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        apply_skill_level_ups(self)
    }
}

/// XP requirement after `xp_next` grows by one level.
pub fn next_xp_requirement(xp_next: u64) -> u64 {
    ((xp_next as f64 * SKILL_XP_GROWTH).round() as u64).max(1)
}

/// Converts banked XP into levels while the skill is below the max level.
///
/// Each level consumes `xp_next` and grows it by [`SKILL_XP_GROWTH`]. At the
/// max level XP keeps accumulating but no further levels are granted.
pub fn apply_skill_level_ups(progress: &mut SkillProgress) -> u32 {
    if progress.xp_next == 0 {
        progress.xp_next = SKILL_XP_NEXT_START;
    }
    let mut gained = 0;
    while progress.level < SKILL_MAX_LEVEL && progress.xp >= progress.xp_next {
        progress.xp -= progress.xp_next;
        progress.xp_next = next_xp_requirement(progress.xp_next);
        progress.level += 1;
        gained += 1;
    }
    gained
}
