//! Burst and full-automatic fire
//!
//! The first round of a trigger pull goes through the normal fire path; the
//! follow-on rounds of a burst are scheduled up front at the weapon's cyclic
//! rate, while a full-auto string schedules one round at a time for as long
//! as the shooter keeps the trigger down.

use serde::{Deserialize, Serialize};

use crate::combat::aiming::AimingBonusTier;
use crate::combat::constants::{STATE_FIRING, STATE_RECOVERING};
use crate::combat::continuation;
use crate::combat::effects::ProjectileShot;
use crate::combat::reload;
use crate::combat::transition;
use crate::combat::weapons::FiringMode;
use crate::core::error::{CombatError, Result};
use crate::core::types::{EntityId, Tick, Vec2};
use crate::simulation::command::Command;
use crate::simulation::context::SimulationContext;

/// Progress of the automatic string currently in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstTracker {
    /// Rounds fired so far in the current string
    pub shots_fired: u32,
    pub last_automatic_shot: Option<Tick>,
    pub automatic_firing: bool,
}

impl BurstTracker {
    /// First round of a string has left the barrel
    pub fn begin(&mut self, tick: Tick) {
        self.automatic_firing = true;
        self.shots_fired = 1;
        self.last_automatic_shot = Some(tick);
    }

    pub fn record_shot(&mut self, shot: u32, tick: Tick) {
        self.shots_fired = shot;
        self.last_automatic_shot = Some(tick);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Every round after the first shoots less accurately
    pub fn accuracy_penalty_applies(&self) -> bool {
        self.shots_fired > 1
    }
}

/// Queue rounds 2..=N of a burst whose first round fired at `first_shot_tick`
pub fn schedule_burst_shots(
    ctx: &mut SimulationContext,
    id: EntityId,
    target: EntityId,
    first_shot_tick: Tick,
) -> Result<()> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_ref().ok_or(CombatError::NoWeapon(id))?;
    let burst_size = weapon.definition().burst_size;
    let cyclic = weapon.definition().cyclic_rate_ticks;

    let record = ctx.states.entry(id);
    if burst_size <= 1 {
        record.burst.reset();
        return Ok(());
    }
    record.burst.begin(first_shot_tick);

    for shot in 2..=burst_size {
        let due = first_shot_tick + cyclic * Tick::from(shot - 1);
        ctx.scheduler.schedule(due, id, Command::BurstShot { target, shot });
    }
    tracing::debug!(entity = %id, burst_size, cyclic, "burst scheduled");
    Ok(())
}

/// Handler for `Command::BurstShot`
///
/// A burst keeps firing while its target is still on the field (even if
/// down) and rounds remain; otherwise the rest of it is dropped.
pub(crate) fn fire_burst_shot(
    ctx: &mut SimulationContext,
    id: EntityId,
    target: EntityId,
    shot: u32,
) -> Result<()> {
    if !ctx.states.get(id).is_some_and(|r| r.burst.automatic_firing) {
        tracing::debug!(entity = %id, shot, "burst already over, round dropped");
        return Ok(());
    }

    let target_position = ctx.roster.get(target).map(|t| t.position);
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_ref().ok_or(CombatError::NoWeapon(id))?;

    let Some(position) = target_position.filter(|_| !weapon.is_empty()) else {
        tracing::info!(entity = %id, shot, "burst interrupted");
        return finish_automatic_string(ctx, id);
    };

    let burst_size = weapon.definition().burst_size;
    discharge_automatic_round(ctx, id, target, position, shot)?;

    if shot >= burst_size {
        tracing::debug!(entity = %id, shots = shot, "burst complete");
        return finish_automatic_string(ctx, id);
    }
    Ok(())
}

/// Start a full-auto string after its first round fired at `tick`
pub fn begin_full_auto(
    ctx: &mut SimulationContext,
    id: EntityId,
    target: EntityId,
    tick: Tick,
) -> Result<()> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_ref().ok_or(CombatError::NoWeapon(id))?;
    let delay = weapon.definition().firing_delay_ticks;

    ctx.states.entry(id).burst.begin(tick);
    ctx.scheduler
        .schedule(tick + delay, id, Command::FullAutoShot { target });
    Ok(())
}

/// Handler for `Command::FullAutoShot`
///
/// The string continues while the shooter stays on persistent attack and the
/// target is standing with rounds left. The shooter's own condition is not
/// consulted.
pub(crate) fn fire_full_auto_shot(
    ctx: &mut SimulationContext,
    id: EntityId,
    target: EntityId,
) -> Result<()> {
    let now = ctx.now();
    if !ctx.states.get(id).is_some_and(|r| r.burst.automatic_firing) {
        return Ok(());
    }

    let target_position = ctx
        .roster
        .get(target)
        .filter(|t| !t.incapacitated)
        .map(|t| t.position);
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_ref().ok_or(CombatError::NoWeapon(id))?;
    let delay = weapon.definition().firing_delay_ticks;

    let position = match target_position {
        Some(position) if combatant.persistent_attack && !weapon.is_empty() => position,
        _ => {
            tracing::info!(entity = %id, "full-auto string stopped");
            return finish_automatic_string(ctx, id);
        }
    };

    let shot = ctx.states.get(id).map_or(1, |r| r.burst.shots_fired + 1);
    discharge_automatic_round(ctx, id, target, position, shot)?;
    ctx.scheduler
        .schedule(now + delay, id, Command::FullAutoShot { target });
    Ok(())
}

fn discharge_automatic_round(
    ctx: &mut SimulationContext,
    id: EntityId,
    target: EntityId,
    target_position: Vec2,
    shot: u32,
) -> Result<()> {
    let now = ctx.now();
    let units_per_foot = ctx.config.units_per_foot;
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    if !weapon.consume_round() {
        return Ok(());
    }
    combatant.statistics.shots_fired += 1;

    let record = ctx.states.entry(id);
    record.burst.record_shot(shot, now);
    let penalty = record.burst.accuracy_penalty_applies();

    let definition = weapon.definition();
    ctx.effects.play_weapon_sound(id, definition, now);
    ctx.effects.add_muzzle_flash(id, now);
    ctx.effects.schedule_projectile_impact(ProjectileShot {
        shooter: id,
        target,
        weapon_id: definition.id.clone(),
        fire_tick: now,
        distance_feet: combatant.position.distance(&target_position) / units_per_foot,
        burst_shot: shot,
        burst_penalty: penalty,
        aiming_bonus: AimingBonusTier::None,
    });
    tracing::debug!(shooter = %id, target = %target, shot, ammo = weapon.ammunition(), "automatic round fired");
    Ok(())
}

/// End the automatic string
///
/// An attack still open after recovery ends here. One that recovery already
/// closed only needs the magazine checked.
fn finish_automatic_string(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let record = ctx.states.entry(id);
    record.burst.reset();
    let attacking = record.attack.is_attacking;
    let in_flight = ctx
        .roster
        .get(id)
        .and_then(|c| c.ranged_weapon.as_ref())
        .is_some_and(|w| w.is_in(STATE_FIRING) || w.is_in(STATE_RECOVERING));
    if in_flight {
        Ok(())
    } else if attacking {
        transition::end_attack_sequence(ctx, id)
    } else if reload::needs_reload(ctx, id) {
        reload::start_reload(ctx, id).map(|_| ())
    } else {
        Ok(())
    }
}

/// Pick the follow-up for sustained fire once an attack has ended
///
/// A burst still in flight resumes after its last round plus the firing
/// delay; anything else goes through the standard single-attack pacing.
pub fn handle_continuous_firing(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let burst = ctx.states.get(id).map(|r| r.burst).unwrap_or_default();

    if let Some(weapon) = combatant.ranged_weapon.as_ref().filter(|_| !combatant.melee_mode) {
        let definition = weapon.definition();
        if weapon.firing_mode() == FiringMode::Burst && burst.automatic_firing {
            let last = burst.last_automatic_shot.unwrap_or(now);
            let mut resume = last
                + definition.cyclic_rate_ticks * Tick::from(definition.burst_size.saturating_sub(1))
                + definition.firing_delay_ticks;
            if resume <= now {
                resume = now + definition.firing_delay_ticks;
            }
            tracing::debug!(entity = %id, resume, "next burst scheduled");
            ctx.scheduler.schedule(resume, id, Command::ResumeAfterBurst);
            return Ok(());
        }
    }
    continue_standard_attack(ctx, id)
}

/// Handler for `Command::ResumeAfterBurst`
///
/// A persistent shooter with its target still standing opens the next burst;
/// otherwise the usual continuation check decides.
pub(crate) fn resume_after_burst(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let Some(record) = ctx.states.get(id) else {
        return Ok(());
    };
    if record.attack.is_attacking || record.reload.is_some() {
        return Ok(());
    }
    let target = record.targets.current.filter(|t| ctx.roster.is_active(*t));
    match target {
        Some(target) if combatant.persistent_attack && !combatant.incapacitated => {
            transition::start_attack_sequence(ctx, id, Some(target))?;
            Ok(())
        }
        _ => continuation::check_continuous_attack(ctx, id),
    }
}

/// Pace the next single attack by the weapon's firing delay
///
/// At most one continuation is issued per tick.
pub fn continue_standard_attack(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let delay = combatant
        .active_weapon()
        .map_or(0, |w| w.definition().firing_delay_ticks);

    let record = ctx.states.entry(id);
    if record.attack.last_continue_attack_tick == Some(now) {
        tracing::debug!(entity = %id, tick = now, "continuation already issued this tick");
        return Ok(());
    }
    record.attack.last_continue_attack_tick = Some(now);

    if delay > 0 {
        ctx.scheduler
            .schedule(now + delay, id, Command::ContinueStandardAttack);
        Ok(())
    } else {
        resume_sustained_fire(ctx, id)
    }
}

/// Handler for `Command::ContinueStandardAttack`
pub(crate) fn resume_sustained_fire(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let record = ctx.states.get(id);
    if record.is_some_and(|r| r.attack.is_attacking || r.reload.is_some()) {
        return Ok(());
    }
    let target = record
        .and_then(|r| r.targets.current)
        .filter(|t| ctx.roster.is_active(*t));

    let has_rounds = combatant.melee_mode
        || combatant.ranged_weapon.as_ref().is_some_and(|w| !w.is_empty());

    match target {
        Some(target) if combatant.persistent_attack && !combatant.incapacitated && has_rounds => {
            transition::start_attack_sequence(ctx, id, Some(target))?;
        }
        _ if !has_rounds => {
            reload::start_reload(ctx, id)?;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_lifecycle() {
        let mut tracker = BurstTracker::default();
        assert!(!tracker.automatic_firing);

        tracker.begin(100);
        assert!(tracker.automatic_firing);
        assert_eq!(tracker.shots_fired, 1);
        assert!(!tracker.accuracy_penalty_applies());

        tracker.record_shot(2, 110);
        assert!(tracker.accuracy_penalty_applies());
        assert_eq!(tracker.last_automatic_shot, Some(110));

        tracker.reset();
        assert_eq!(tracker, BurstTracker::default());
    }
}
