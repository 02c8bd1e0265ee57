//! Roster entries as seen by the dungeon engine.

use super::attributes::{AttributeType, Attributes};
use crate::core::progression::SkillProgress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type PlayerId = String;

/// Broad weapon family. Drives attack cadence, threat and mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    #[default]
    Melee,
    Ranged,
    Magic,
}

impl WeaponType {
    pub fn combat_skill(&self) -> CombatSkill {
        match self {
            WeaponType::Melee => CombatSkill::Melee,
            WeaponType::Ranged => CombatSkill::Ranged,
            WeaponType::Magic => CombatSkill::Magic,
        }
    }
}

/// Combat skill that receives XP from dungeon waves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatSkill {
    Melee,
    Ranged,
    Magic,
}

impl CombatSkill {
    pub fn all() -> [CombatSkill; 3] {
        [CombatSkill::Melee, CombatSkill::Ranged, CombatSkill::Magic]
    }
}

/// Equipped gear, reduced to what combat cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    /// Slot name -> item id, kept for historical display in replays.
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
    #[serde(default)]
    pub weapon_type: WeaponType,
    #[serde(default)]
    pub armor: u32,
    /// Attribute bonus summed over all equipped items.
    #[serde(default)]
    pub bonus: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub combat_skills: BTreeMap<CombatSkill, SkillProgress>,
    /// Non-combat idle action the hero is busy with, if any.
    #[serde(default)]
    pub current_action: Option<String>,
}

impl PlayerState {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Attributes::new(),
            equipment: Equipment::default(),
            combat_skills: BTreeMap::new(),
            current_action: None,
        }
    }

    /// Base attributes plus gear bonus.
    pub fn effective_attributes(&self) -> Attributes {
        self.attributes.combined(&self.equipment.bonus)
    }

    pub fn effective(&self, attr: AttributeType) -> u32 {
        self.effective_attributes().get(attr)
    }

    pub fn weapon_type(&self) -> WeaponType {
        self.equipment.weapon_type
    }

    /// Level of the combat skill matching the equipped weapon.
    pub fn combat_level(&self) -> u32 {
        self.combat_skills
            .get(&self.weapon_type().combat_skill())
            .map(|p| p.level)
            .unwrap_or(1)
    }

    pub fn skill_mut(&mut self, skill: CombatSkill) -> &mut SkillProgress {
        self.combat_skills.entry(skill).or_default()
    }

    pub fn is_idle(&self) -> bool {
        self.current_action.is_none()
    }
}
