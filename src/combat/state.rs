//! Per-entity combat state component table
//!
//! One record per combatant holds every piece of transient combat state.
//! Records appear on first access (or when a combatant is added) and are
//! dropped only by an explicit cleanup.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::combat::aiming::AimTimer;
use crate::combat::burst::BurstTracker;
use crate::combat::constants::STATE_AIMING;
use crate::combat::defense::DefenseTracker;
use crate::combat::reaction::ReactionWatch;
use crate::combat::reload::ReloadProgress;
use crate::core::types::{EntityId, Tick};

/// Where the character wants its weapon held
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldPreferences {
    /// Preferred resting posture; `None` means aiming
    pub hold_state: Option<String>,
    /// Pin for the ready sequence: stop once this state is reached
    pub target_hold_state: Option<String>,
    /// Fire from aim (true) or from the hip (false)
    pub fires_from_aiming: bool,
}

impl Default for HoldPreferences {
    fn default() -> Self {
        Self {
            hold_state: None,
            target_hold_state: None,
            fires_from_aiming: true,
        }
    }
}

impl HoldPreferences {
    pub fn hold_state(&self) -> &str {
        self.hold_state.as_deref().unwrap_or(STATE_AIMING)
    }
}

/// Relations to other combatants, by id only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLinks {
    pub current: Option<EntityId>,
    pub previous: Option<EntityId>,
    pub melee: Option<EntityId>,
}

/// Bookkeeping for the attack sequence in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackProgress {
    pub is_attacking: bool,
    /// Fire tick of the last scheduled shot, to drop duplicate schedules
    pub last_firing_scheduled_tick: Option<Tick>,
    /// Tick the last sustained-fire continuation was issued on
    pub last_continue_attack_tick: Option<Tick>,
    /// Aimed shots already fired in a multiple-shot sequence
    pub shots_in_sequence: u32,
    /// Bearing towards the last target engaged
    pub last_target_facing: Option<f32>,
}

/// Everything the timing engine tracks for one combatant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatRecord {
    pub hold: HoldPreferences,
    pub aim: AimTimer,
    pub burst: BurstTracker,
    pub reload: Option<ReloadProgress>,
    pub defense: DefenseTracker,
    pub targets: TargetLinks,
    pub reaction: Option<ReactionWatch>,
    pub attack: AttackProgress,
}

#[derive(Debug, Clone, Default)]
pub struct CombatStateTable {
    records: AHashMap<EntityId, CombatRecord>,
}

impl CombatStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<&CombatRecord> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut CombatRecord> {
        self.records.get_mut(&id)
    }

    /// Record for `id`, created with defaults on first access
    pub fn entry(&mut self, id: EntityId) -> &mut CombatRecord {
        self.records.entry(id).or_default()
    }

    /// Create the record eagerly (no-op when it exists)
    pub fn ensure(&mut self, id: EntityId) {
        self.entry(id);
    }

    /// Drop every piece of state held for `id`; true when something was removed
    pub fn cleanup(&mut self, id: EntityId) -> bool {
        self.records.remove(&id).is_some()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_created_lazily() {
        let mut table = CombatStateTable::new();
        assert!(table.get(EntityId(1)).is_none());
        table.entry(EntityId(1)).attack.is_attacking = true;
        assert!(table.get(EntityId(1)).is_some_and(|r| r.attack.is_attacking));
    }

    #[test]
    fn test_default_record_prefers_aiming() {
        let record = CombatRecord::default();
        assert!(record.hold.fires_from_aiming);
        assert_eq!(record.hold.hold_state(), "aiming");
        assert!(record.reload.is_none());
        assert!(record.targets.current.is_none());
    }

    #[test]
    fn test_cleanup_removes_everything() {
        let mut table = CombatStateTable::new();
        table.ensure(EntityId(3));
        table.ensure(EntityId(3));
        assert_eq!(table.len(), 1);
        assert!(table.cleanup(EntityId(3)));
        assert!(!table.cleanup(EntityId(3)));
        assert!(table.is_empty());
    }
}
