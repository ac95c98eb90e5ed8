//! Target acquisition seam
//!
//! The engine never searches for targets itself; it asks a service.

use crate::combat::combatant::{Combatant, Roster};
use crate::core::types::EntityId;

/// Finds a new hostile for a combatant that has none
pub trait TargetingService {
    fn find_nearest_hostile(&self, shooter: &Combatant, roster: &Roster) -> Option<EntityId>;
}

/// Closest standing member of another faction; ties go to the lower id
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestHostile;

impl TargetingService for NearestHostile {
    fn find_nearest_hostile(&self, shooter: &Combatant, roster: &Roster) -> Option<EntityId> {
        roster
            .iter()
            .filter(|other| other.id != shooter.id && !other.incapacitated && shooter.is_hostile_to(other))
            .map(|other| (shooter.position.distance(&other.position), other.id))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id)
    }
}
