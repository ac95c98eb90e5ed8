//! Weapon definitions, state graphs and live weapon instances
//!
//! A weapon type owns an immutable graph of named states. Each state names
//! its successor and how long a weapon dwells there before moving on. Live
//! instances point into that graph by state name and never leave it.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::combat::constants::{is_transient_state, STATE_MELEE_READY, STATE_READY};
use crate::combat::skill::SkillKind;
use crate::core::error::{CombatError, Result};
use crate::core::types::Tick;

/// Melee weapon length class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeleeReach {
    /// Fists and feet
    Unarmed,
    /// Knives, daggers
    Short,
    /// Swords, sabres
    Medium,
    /// Spears, bayonets fixed on a rifle
    Long,
    /// A weapon in each hand
    TwoWeapon,
}

impl MeleeReach {
    pub fn skill(&self) -> Option<SkillKind> {
        match self {
            MeleeReach::Unarmed => None,
            MeleeReach::Short => Some(SkillKind::Knife),
            MeleeReach::Medium | MeleeReach::TwoWeapon => Some(SkillKind::Sword),
            MeleeReach::Long => Some(SkillKind::Spear),
        }
    }
}

/// Broad weapon family, used for skill lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    Pistol,
    Rifle,
    SubmachineGun,
    Other,
    Melee(MeleeReach),
}

impl WeaponCategory {
    /// Skill that governs this weapon, if any
    pub fn skill(&self) -> Option<SkillKind> {
        match self {
            WeaponCategory::Pistol => Some(SkillKind::Pistol),
            WeaponCategory::Rifle => Some(SkillKind::Rifle),
            WeaponCategory::SubmachineGun => Some(SkillKind::SubmachineGun),
            WeaponCategory::Other => None,
            WeaponCategory::Melee(reach) => reach.skill(),
        }
    }

    pub fn is_melee(&self) -> bool {
        matches!(self, WeaponCategory::Melee(_))
    }

    /// Only pistols, rifles and submachine guns reward very careful aim
    pub fn supports_very_careful_aim(&self) -> bool {
        matches!(
            self,
            WeaponCategory::Pistol | WeaponCategory::Rifle | WeaponCategory::SubmachineGun
        )
    }
}

/// How many rounds leave the barrel per trigger pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiringMode {
    SingleShot,
    Burst,
    FullAuto,
}

/// How ammunition is restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadType {
    /// One round per completion, repeating until full (revolvers, tube magazines)
    SingleRound,
    /// Whole magazine in one completion
    FullMagazine,
}

/// One node of a weapon's state graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStateDefinition {
    pub name: String,
    pub successor: Option<String>,
    pub base_ticks: Tick,
}

impl WeaponStateDefinition {
    pub fn new(name: &str, successor: Option<&str>, base_ticks: Tick) -> Self {
        Self {
            name: name.to_string(),
            successor: successor.map(str::to_string),
            base_ticks,
        }
    }
}

/// Immutable state graph shared by every instance of a weapon type
#[derive(Debug, Clone)]
pub struct WeaponStateGraph {
    states: Vec<WeaponStateDefinition>,
    index: AHashMap<String, usize>,
    initial: usize,
}

impl WeaponStateGraph {
    /// Build a graph, rejecting duplicate names and an unknown initial state
    ///
    /// A successor naming a state the graph lacks is tolerated: progression
    /// falls back to the ready state when it reaches that edge.
    pub fn new(initial: &str, states: Vec<WeaponStateDefinition>) -> Result<Self> {
        let mut index = AHashMap::with_capacity(states.len());
        for (i, state) in states.iter().enumerate() {
            if index.insert(state.name.clone(), i).is_some() {
                return Err(CombatError::InvalidDefinition(format!(
                    "duplicate weapon state '{}'",
                    state.name
                )));
            }
        }

        let initial = *index.get(initial).ok_or_else(|| {
            CombatError::InvalidDefinition(format!("initial state '{}' is not defined", initial))
        })?;

        for state in &states {
            if let Some(next) = &state.successor {
                if !index.contains_key(next) {
                    tracing::warn!(
                        state = %state.name,
                        successor = %next,
                        "weapon state names an undefined successor"
                    );
                }
            }
        }

        Ok(Self { states, index, initial })
    }

    pub fn get(&self, name: &str) -> Option<&WeaponStateDefinition> {
        self.index.get(name).map(|&i| &self.states[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn initial(&self) -> &WeaponStateDefinition {
        &self.states[self.initial]
    }

    /// The successor of `name`, when both the edge and its target exist
    pub fn successor_of(&self, name: &str) -> Option<&WeaponStateDefinition> {
        self.get(name)
            .and_then(|state| state.successor.as_deref())
            .and_then(|next| self.get(next))
    }

    /// Ready state used as the fallback target (`ready`, else `melee_ready`)
    pub fn ready_state(&self) -> Option<&WeaponStateDefinition> {
        self.get(STATE_READY).or_else(|| self.get(STATE_MELEE_READY))
    }

    pub fn states(&self) -> &[WeaponStateDefinition] {
        &self.states
    }

    /// States a character may deliberately hold at
    pub fn hold_candidates(&self) -> impl Iterator<Item = &WeaponStateDefinition> {
        self.states.iter().filter(|s| !is_transient_state(&s.name))
    }
}

/// Static, shared description of a weapon type
#[derive(Debug, Clone)]
pub struct WeaponDefinition {
    pub id: String,
    pub name: String,
    pub category: WeaponCategory,
    pub states: Arc<WeaponStateGraph>,
    pub max_ammunition: u32,
    /// Modes the weapon supports; the first is its default
    pub firing_modes: Vec<FiringMode>,
    pub burst_size: u32,
    /// Spacing between shots of a burst
    pub cyclic_rate_ticks: Tick,
    /// Spacing between trigger pulls in sustained fire
    pub firing_delay_ticks: Tick,
    pub reload_ticks: Tick,
    pub reload_type: ReloadType,
    pub defense_bonus: i32,
    /// Melee wind-up before a strike lands
    pub attack_speed_ticks: Tick,
    /// Melee recovery after a strike
    pub attack_cooldown_ticks: Tick,
    /// Extra melee reach beyond arm's length, in feet
    pub reach_feet: f32,
}

impl WeaponDefinition {
    pub fn is_melee(&self) -> bool {
        self.category.is_melee()
    }
}

/// A weapon carried by one combatant
#[derive(Debug, Clone)]
pub struct WeaponInstance {
    definition: Arc<WeaponDefinition>,
    state: String,
    ammunition: u32,
    firing_mode: FiringMode,
}

impl WeaponInstance {
    /// Fully loaded, sitting in the graph's initial state
    pub fn new(definition: Arc<WeaponDefinition>) -> Self {
        let state = definition.states.initial().name.clone();
        let ammunition = definition.max_ammunition;
        let firing_mode = definition
            .firing_modes
            .first()
            .copied()
            .unwrap_or(FiringMode::SingleShot);
        Self {
            definition,
            state,
            ammunition,
            firing_mode,
        }
    }

    pub fn definition(&self) -> &WeaponDefinition {
        &self.definition
    }

    pub fn graph(&self) -> &WeaponStateGraph {
        &self.definition.states
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn is_in(&self, name: &str) -> bool {
        self.state == name
    }

    /// Definition of the current state
    pub fn state_definition(&self) -> Result<&WeaponStateDefinition> {
        self.definition
            .states
            .get(&self.state)
            .ok_or_else(|| self.missing(&self.state))
    }

    /// Move to a named state; the name must belong to this weapon's graph
    pub fn enter_state(&mut self, name: &str) -> Result<()> {
        if !self.definition.states.contains(name) {
            return Err(self.missing(name));
        }
        if self.state != name {
            tracing::trace!(weapon = %self.definition.id, from = %self.state, to = name, "weapon state change");
            self.state = name.to_string();
        }
        Ok(())
    }

    /// Jump to the graph's ready state, returning its name
    pub fn fall_back_to_ready(&mut self) -> Result<String> {
        let ready = self
            .definition
            .states
            .ready_state()
            .map(|s| s.name.clone())
            .ok_or_else(|| self.missing(STATE_READY))?;
        tracing::debug!(weapon = %self.definition.id, from = %self.state, to = %ready, "falling back to ready state");
        self.state = ready.clone();
        Ok(ready)
    }

    pub fn ammunition(&self) -> u32 {
        self.ammunition
    }

    pub fn max_ammunition(&self) -> u32 {
        self.definition.max_ammunition
    }

    pub fn is_empty(&self) -> bool {
        self.ammunition == 0
    }

    pub fn is_full(&self) -> bool {
        self.ammunition >= self.definition.max_ammunition
    }

    /// Spend one round; false when the weapon is already empty
    pub fn consume_round(&mut self) -> bool {
        if self.ammunition == 0 {
            return false;
        }
        self.ammunition -= 1;
        true
    }

    /// Add one round, capped at capacity; returns the new count
    pub fn load_round(&mut self) -> u32 {
        self.ammunition = (self.ammunition + 1).min(self.definition.max_ammunition);
        self.ammunition
    }

    pub fn fill(&mut self) {
        self.ammunition = self.definition.max_ammunition;
    }

    pub fn set_ammunition(&mut self, rounds: u32) {
        self.ammunition = rounds.min(self.definition.max_ammunition);
    }

    pub fn firing_mode(&self) -> FiringMode {
        self.firing_mode
    }

    /// Select a mode the weapon supports; false when it does not
    pub fn set_firing_mode(&mut self, mode: FiringMode) -> bool {
        if self.definition.firing_modes.contains(&mode) {
            self.firing_mode = mode;
            true
        } else {
            false
        }
    }

    /// Step to the next supported mode, wrapping around
    pub fn cycle_firing_mode(&mut self) -> FiringMode {
        let modes = &self.definition.firing_modes;
        if let Some(pos) = modes.iter().position(|m| *m == self.firing_mode) {
            self.firing_mode = modes[(pos + 1) % modes.len()];
        } else if let Some(first) = modes.first() {
            self.firing_mode = *first;
        }
        self.firing_mode
    }

    fn missing(&self, state: &str) -> CombatError {
        CombatError::MissingState {
            weapon: self.definition.id.clone(),
            state: state.to_string(),
        }
    }
}
