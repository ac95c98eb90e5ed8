//! Weapon skills
//!
//! Skills feed timing (quickdraw), defense values, and gate very careful aiming.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Trainable combat skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Pistol,
    Rifle,
    SubmachineGun,
    Quickdraw,
    Knife,
    Sword,
    Spear,
}

/// Skill levels held by one combatant; absent skills are level 0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSet {
    levels: AHashMap<SkillKind, u8>,
}

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for setting a skill level
    pub fn with(mut self, kind: SkillKind, level: u8) -> Self {
        self.set(kind, level);
        self
    }

    pub fn set(&mut self, kind: SkillKind, level: u8) {
        if level == 0 {
            self.levels.remove(&kind);
        } else {
            self.levels.insert(kind, level);
        }
    }

    pub fn level(&self, kind: SkillKind) -> u8 {
        self.levels.get(&kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_skill_is_zero() {
        let skills = SkillSet::new();
        assert_eq!(skills.level(SkillKind::Pistol), 0);
    }

    #[test]
    fn test_set_and_clear_skill() {
        let mut skills = SkillSet::new().with(SkillKind::Quickdraw, 2);
        assert_eq!(skills.level(SkillKind::Quickdraw), 2);
        skills.set(SkillKind::Quickdraw, 0);
        assert_eq!(skills.level(SkillKind::Quickdraw), 0);
    }
}
