//! Combatants and the roster that owns them

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::combat::aiming::AimingSpeed;
use crate::combat::modifiers::{
    aiming_ready_multiplier, aiming_speed_multiplier, reload_speed_multiplier, stat_to_modifier,
    weapon_ready_speed_multiplier,
};
use crate::combat::skill::{SkillKind, SkillSet};
use crate::combat::weapons::WeaponInstance;
use crate::core::types::{EntityId, FactionId, Vec2};

/// Raw 1..=100 attributes; 50 is average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub dexterity: i32,
    pub reflexes: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            dexterity: 50,
            reflexes: 50,
        }
    }
}

/// Running combat tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStatistics {
    pub attacks_started: u32,
    pub shots_fired: u32,
    pub melee_strikes: u32,
    pub reloads_completed: u32,
    pub defensive_attempts: u32,
    pub defensive_successes: u32,
    pub counter_attacks_executed: u32,
    pub counter_attacks_successful: u32,
    pub targets_engaged: u32,
}

/// A character taking part in combat
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: EntityId,
    pub name: String,
    pub faction: FactionId,
    pub attributes: Attributes,
    pub skills: SkillSet,
    pub position: Vec2,
    /// Compass facing in degrees; `None` until first set
    pub facing: Option<f32>,
    pub ranged_weapon: Option<WeaponInstance>,
    pub melee_weapon: Option<WeaponInstance>,
    /// Fight with the melee weapon instead of the ranged one
    pub melee_mode: bool,
    pub aiming_speed: AimingSpeed,
    /// Re-engage automatically after each attack sequence
    pub persistent_attack: bool,
    /// Pick targets through the targeting service when none is set
    pub automatic_targeting: bool,
    /// Aimed shots per attack sequence (1 = a single shot)
    pub multiple_shot_count: u32,
    pub incapacitated: bool,
    pub statistics: CombatStatistics,
}

impl Combatant {
    pub fn new(id: EntityId, name: impl Into<String>, faction: FactionId) -> Self {
        Self {
            id,
            name: name.into(),
            faction,
            attributes: Attributes::default(),
            skills: SkillSet::new(),
            position: Vec2::default(),
            facing: None,
            ranged_weapon: None,
            melee_weapon: None,
            melee_mode: false,
            aiming_speed: AimingSpeed::Normal,
            persistent_attack: false,
            automatic_targeting: false,
            multiple_shot_count: 1,
            incapacitated: false,
            statistics: CombatStatistics::default(),
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_skills(mut self, skills: SkillSet) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_ranged_weapon(mut self, weapon: WeaponInstance) -> Self {
        self.ranged_weapon = Some(weapon);
        self
    }

    pub fn with_melee_weapon(mut self, weapon: WeaponInstance) -> Self {
        self.melee_weapon = Some(weapon);
        self
    }

    /// Weapon for the current combat mode
    pub fn active_weapon(&self) -> Option<&WeaponInstance> {
        if self.melee_mode {
            self.melee_weapon.as_ref()
        } else {
            self.ranged_weapon.as_ref()
        }
    }

    pub fn active_weapon_mut(&mut self) -> Option<&mut WeaponInstance> {
        if self.melee_mode {
            self.melee_weapon.as_mut()
        } else {
            self.ranged_weapon.as_mut()
        }
    }

    pub fn reflexes_modifier(&self) -> i32 {
        stat_to_modifier(self.attributes.reflexes)
    }

    pub fn dexterity_modifier(&self) -> i32 {
        stat_to_modifier(self.attributes.dexterity)
    }

    pub fn weapon_ready_multiplier(&self) -> f64 {
        weapon_ready_speed_multiplier(
            self.reflexes_modifier(),
            self.skills.level(SkillKind::Quickdraw),
        )
    }

    pub fn reload_multiplier(&self) -> f64 {
        reload_speed_multiplier(self.reflexes_modifier())
    }

    pub fn aiming_multiplier(&self) -> f64 {
        aiming_speed_multiplier(aiming_ready_multiplier(
            self.reflexes_modifier(),
            self.skills.level(SkillKind::Quickdraw),
        ))
    }

    /// Skill level for the active weapon's category
    pub fn active_weapon_skill(&self) -> u8 {
        self.active_weapon()
            .and_then(|w| w.definition().category.skill())
            .map(|kind| self.skills.level(kind))
            .unwrap_or(0)
    }

    /// Very careful aim needs a firearm that supports it and some training with it
    pub fn can_use_very_careful_aim(&self) -> bool {
        self.ranged_weapon
            .as_ref()
            .map(|w| w.definition().category)
            .filter(|category| category.supports_very_careful_aim())
            .and_then(|category| category.skill())
            .is_some_and(|skill| self.skills.level(skill) >= 1)
    }

    pub fn is_hostile_to(&self, other: &Combatant) -> bool {
        self.faction != other.faction
    }
}

/// All combatants in a simulation, keyed by id
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: AHashMap<EntityId, Combatant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, combatant: Combatant) {
        self.members.insert(combatant.id, combatant);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Combatant> {
        self.members.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.members.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.members.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains_key(&id)
    }

    /// Ids in ascending order, for deterministic iteration
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.members.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when the combatant exists and is still standing
    pub fn is_active(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|c| !c.incapacitated)
    }
}
