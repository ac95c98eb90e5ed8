//! Effects seam - sound, flashes and impact scheduling
//!
//! The timing engine reports what happened; rendering, audio and hit
//! resolution live behind this trait and never block the tick loop.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::combat::aiming::AimingBonusTier;
use crate::combat::weapons::WeaponDefinition;
use crate::core::types::{EntityId, Tick};

/// Everything hit resolution needs to know about one round leaving the barrel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileShot {
    pub shooter: EntityId,
    pub target: EntityId,
    pub weapon_id: String,
    pub fire_tick: Tick,
    pub distance_feet: f32,
    /// 1-based position within the current burst or auto string
    pub burst_shot: u32,
    /// Follow-on shots of a burst or auto string shoot less accurately
    pub burst_penalty: bool,
    pub aiming_bonus: AimingBonusTier,
}

/// Receiver of combat side effects
pub trait EffectsSink {
    fn play_weapon_sound(&mut self, shooter: EntityId, weapon: &WeaponDefinition, tick: Tick);
    fn schedule_projectile_impact(&mut self, shot: ProjectileShot);
    fn schedule_melee_impact(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        weapon: &WeaponDefinition,
        tick: Tick,
    );
    fn apply_firing_highlight(&mut self, shooter: EntityId, tick: Tick);
    fn add_muzzle_flash(&mut self, shooter: EntityId, tick: Tick);
}

/// Discards every effect
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEffects;

impl EffectsSink for NullEffects {
    fn play_weapon_sound(&mut self, _shooter: EntityId, _weapon: &WeaponDefinition, _tick: Tick) {}
    fn schedule_projectile_impact(&mut self, _shot: ProjectileShot) {}
    fn schedule_melee_impact(
        &mut self,
        _attacker: EntityId,
        _target: EntityId,
        _weapon: &WeaponDefinition,
        _tick: Tick,
    ) {
    }
    fn apply_firing_highlight(&mut self, _shooter: EntityId, _tick: Tick) {}
    fn add_muzzle_flash(&mut self, _shooter: EntityId, _tick: Tick) {}
}

/// One recorded effect notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectEvent {
    WeaponSound {
        shooter: EntityId,
        weapon_id: String,
        tick: Tick,
    },
    ProjectileImpact {
        shot: ProjectileShot,
    },
    MeleeImpact {
        attacker: EntityId,
        target: EntityId,
        weapon_id: String,
        tick: Tick,
    },
    FiringHighlight {
        shooter: EntityId,
        tick: Tick,
    },
    MuzzleFlash {
        shooter: EntityId,
        tick: Tick,
    },
}

/// Shared, cloneable recorder of effect notifications
///
/// Hand one clone to the context and keep another to inspect the log.
#[derive(Debug, Clone, Default)]
pub struct EffectLog {
    events: Rc<RefCell<Vec<EffectEvent>>>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EffectEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Projectile impacts in the order they were scheduled
    pub fn projectile_shots(&self) -> Vec<ProjectileShot> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                EffectEvent::ProjectileImpact { shot } => Some(shot.clone()),
                _ => None,
            })
            .collect()
    }

    /// Projectile impacts fired by one shooter
    pub fn shots_by(&self, shooter: EntityId) -> Vec<ProjectileShot> {
        self.projectile_shots()
            .into_iter()
            .filter(|shot| shot.shooter == shooter)
            .collect()
    }

    fn push(&self, event: EffectEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl EffectsSink for EffectLog {
    fn play_weapon_sound(&mut self, shooter: EntityId, weapon: &WeaponDefinition, tick: Tick) {
        self.push(EffectEvent::WeaponSound {
            shooter,
            weapon_id: weapon.id.clone(),
            tick,
        });
    }

    fn schedule_projectile_impact(&mut self, shot: ProjectileShot) {
        self.push(EffectEvent::ProjectileImpact { shot });
    }

    fn schedule_melee_impact(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        weapon: &WeaponDefinition,
        tick: Tick,
    ) {
        self.push(EffectEvent::MeleeImpact {
            attacker,
            target,
            weapon_id: weapon.id.clone(),
            tick,
        });
    }

    fn apply_firing_highlight(&mut self, shooter: EntityId, tick: Tick) {
        self.push(EffectEvent::FiringHighlight { shooter, tick });
    }

    fn add_muzzle_flash(&mut self, shooter: EntityId, tick: Tick) {
        self.push(EffectEvent::MuzzleFlash { shooter, tick });
    }
}
