//! Melee attack sequence
//!
//! Melee weapons walk their graph to `melee_ready`, wind up for the weapon's
//! attack speed, strike, then cool down back to `melee_ready`. Closing the
//! distance is someone else's job; out of reach, the attacker re-checks
//! periodically until the target steps in or stops being valid.

use crate::combat::constants::{
    BASE_MELEE_REACH_FEET, STATE_MELEE_ATTACKING, STATE_MELEE_READY,
};
use crate::combat::modifiers::scale_ticks;
use crate::combat::transition;
use crate::core::error::{CombatError, Result};
use crate::core::types::EntityId;
use crate::simulation::command::{Command, Progression};
use crate::simulation::context::SimulationContext;

/// Target within arm's length plus the melee weapon's reach
pub fn in_reach(ctx: &SimulationContext, id: EntityId, target: EntityId) -> bool {
    let (Some(attacker), Some(defender)) = (ctx.roster.get(id), ctx.roster.get(target)) else {
        return false;
    };
    let reach = attacker
        .melee_weapon
        .as_ref()
        .map_or(0.0, |w| w.definition().reach_feet);
    let distance_feet = attacker.position.distance(&defender.position) / ctx.config.units_per_foot;
    distance_feet <= BASE_MELEE_REACH_FEET + reach
}

pub(crate) fn start_melee_attack(ctx: &mut SimulationContext, id: EntityId, target: EntityId) -> Result<()> {
    let now = ctx.now();
    ctx.states.entry(id).targets.melee = Some(target);

    if !in_reach(ctx, id, target) {
        let due = now + ctx.config.melee_range_recheck_ticks;
        ctx.scheduler
            .schedule(due, id, Command::MeleeRangeCheck { target });
        tracing::debug!(entity = %id, target = %target, "melee target out of reach");
        return Ok(());
    }
    schedule_melee_from_current_state(ctx, id)
}

/// Drop the attack without running continuation
fn abandon(ctx: &mut SimulationContext, id: EntityId) {
    let record = ctx.states.entry(id);
    record.attack.is_attacking = false;
    record.targets.melee = None;
}

/// Handler for `Command::MeleeRangeCheck`
pub(crate) fn recheck_melee_range(ctx: &mut SimulationContext, id: EntityId, target: EntityId) -> Result<()> {
    let attacking = ctx.states.get(id).is_some_and(|r| r.attack.is_attacking);
    if !attacking {
        return Ok(());
    }
    if !ctx.roster.is_active(id) || !ctx.roster.is_active(target) {
        tracing::debug!(entity = %id, target = %target, "melee approach abandoned");
        abandon(ctx, id);
        return Ok(());
    }
    start_melee_attack(ctx, id, target)
}

/// Continue the melee sequence from wherever the melee weapon stands
pub(crate) fn schedule_melee_from_current_state(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.melee_weapon.as_ref().ok_or(CombatError::NoWeapon(id))?;
    let record = ctx.states.get(id);
    if !record.is_some_and(|r| r.attack.is_attacking) {
        return Ok(());
    }

    match weapon.state() {
        STATE_MELEE_ATTACKING => Ok(()),
        STATE_MELEE_READY => {
            let target = record
                .and_then(|r| r.targets.melee.or(r.targets.current))
                .ok_or(CombatError::EntityNotFound(id))?;
            let windup = scale_ticks(
                weapon.definition().attack_speed_ticks,
                combatant.weapon_ready_multiplier(),
            );
            let handle = ctx
                .scheduler
                .schedule(now + windup, id, Command::MeleeStrike { target });
            tracing::debug!(entity = %id, target = %target, due = handle.due, "strike scheduled");
            Ok(())
        }
        _ => transition::advance_toward_successor(ctx, id, Progression::Melee),
    }
}

/// Handler for `Command::MeleeStrike`
pub(crate) fn execute_melee_strike(ctx: &mut SimulationContext, id: EntityId, target: EntityId) -> Result<()> {
    let now = ctx.now();
    if !ctx.states.get(id).is_some_and(|r| r.attack.is_attacking) {
        return Ok(());
    }
    if !ctx.roster.is_active(id) || !ctx.roster.is_active(target) {
        tracing::debug!(entity = %id, target = %target, "strike called off");
        abandon(ctx, id);
        return Ok(());
    }

    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let multiplier = combatant.weapon_ready_multiplier();
    let weapon = combatant.melee_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    weapon.enter_state(STATE_MELEE_ATTACKING)?;
    combatant.statistics.melee_strikes += 1;

    let definition = weapon.definition();
    ctx.effects.play_weapon_sound(id, definition, now);
    ctx.effects.schedule_melee_impact(id, target, definition, now);
    let cooldown = scale_ticks(definition.attack_cooldown_ticks, multiplier);
    ctx.scheduler.schedule(now + cooldown, id, Command::MeleeRecover);
    tracing::info!(attacker = %id, target = %target, weapon = %definition.id, tick = now, "melee strike");
    Ok(())
}

/// Handler for `Command::MeleeRecover`
pub(crate) fn recover_from_strike(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.melee_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    if !weapon.is_in(STATE_MELEE_ATTACKING) {
        return Ok(());
    }
    weapon.enter_state(STATE_MELEE_READY)?;
    ctx.states.entry(id).targets.melee = None;
    transition::end_attack_sequence(ctx, id)
}
