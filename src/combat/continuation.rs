//! Persistent-attack continuation and automatic retargeting

use crate::combat::burst;
use crate::combat::reload;
use crate::combat::transition;
use crate::core::error::{CombatError, Result};
use crate::core::types::EntityId;
use crate::simulation::command::Command;
use crate::simulation::context::SimulationContext;

/// Decide what a persistent or auto-targeting combatant does once an attack
/// sequence has ended
pub fn check_continuous_attack(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    if !combatant.persistent_attack && !combatant.automatic_targeting {
        return Ok(());
    }
    let record = ctx.states.get(id);
    if record.is_some_and(|r| r.reload.is_some() || r.attack.is_attacking) {
        return Ok(());
    }

    if combatant.incapacitated || combatant.active_weapon().is_none() {
        disengage(ctx, id);
        return Ok(());
    }

    match record.and_then(|r| r.targets.current) {
        None if combatant.automatic_targeting => perform_automatic_target_change(ctx, id),
        None => Ok(()),
        Some(target) if !ctx.roster.is_active(target) => {
            let due = now + ctx.config.retarget_delay_ticks;
            ctx.scheduler.schedule(due, id, Command::Retarget);
            let record = ctx.states.entry(id);
            record.targets.current = None;
            record.attack.is_attacking = false;
            let facing = record.attack.last_target_facing;
            if let Some(combatant) = ctx.roster.get_mut(id) {
                combatant.facing = facing.or(combatant.facing);
            }
            tracing::info!(entity = %id, target = %target, retarget_at = due, "target down");
            Ok(())
        }
        Some(_) => {
            if reload::needs_reload(ctx, id) {
                reload::start_reload(ctx, id)?;
                Ok(())
            } else {
                burst::handle_continuous_firing(ctx, id)
            }
        }
    }
}

/// Handler for `Command::Retarget`: pick the nearest standing hostile and
/// attack it, or stand down when nobody is left or persistent attack is off
pub fn perform_automatic_target_change(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    if !combatant.persistent_attack
        || combatant.incapacitated
        || combatant.active_weapon().is_none()
    {
        disengage(ctx, id);
        return Ok(());
    }

    match ctx.targeting.find_nearest_hostile(combatant, &ctx.roster) {
        Some(target) => {
            tracing::info!(entity = %id, target = %target, "new target acquired");
            ctx.states.entry(id).targets.current = Some(target);
            transition::start_attack_sequence(ctx, id, Some(target))?;
        }
        None => {
            tracing::info!(entity = %id, "no hostiles left, standing down");
            disengage(ctx, id);
        }
    }
    Ok(())
}

/// Stop attacking: persistent mode off, target cleared, facing frozen
/// towards the last target
pub fn disengage(ctx: &mut SimulationContext, id: EntityId) {
    let record = ctx.states.entry(id);
    record.targets.current = None;
    record.attack.is_attacking = false;
    let facing = record.attack.last_target_facing;
    if let Some(combatant) = ctx.roster.get_mut(id) {
        combatant.persistent_attack = false;
        if facing.is_some() {
            combatant.facing = facing;
        }
    }
}

/// Turn persistent attack on or off; turning it on while idle with a live
/// target re-engages straight away
pub fn set_persistent_attack(ctx: &mut SimulationContext, id: EntityId, enabled: bool) -> Result<()> {
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    combatant.persistent_attack = enabled;
    tracing::debug!(entity = %id, enabled, "persistent attack toggled");
    if enabled {
        continue_persistent_attack(ctx, id)?;
    }
    Ok(())
}

/// Re-engage the current target if the combatant is idle and set to persist
pub fn continue_persistent_attack(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let idle = !ctx.states.get(id).is_some_and(|r| r.attack.is_attacking);
    if combatant.persistent_attack && idle {
        check_continuous_attack(ctx, id)?;
    }
    Ok(())
}
