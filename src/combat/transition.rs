//! Weapon state transition driver and attack sequencing
//!
//! Walks a combatant's weapon along its graph towards firing (or towards the
//! ready/hold state), one scheduled edge at a time. Every edge is a
//! `Command::AdvanceWeaponState`; a command whose edge no longer matches the
//! weapon's current state is dropped, so a weapon never jumps to a state that
//! is not the successor of where it stands.

use rand::Rng;

use crate::combat::aiming::{self, aiming_speed_for_shot, AimingBonusTier, AimingSpeed};
use crate::combat::burst;
use crate::combat::combatant::Combatant;
use crate::combat::constants::{
    is_preparation_state, FAST_PATH_FIRE_DELAY, STATE_AIMING, STATE_FIRING, STATE_MELEE_READY,
    STATE_POINTED_FROM_HIP, STATE_READY, STATE_RECOVERING,
};
use crate::combat::continuation;
use crate::combat::effects::ProjectileShot;
use crate::combat::melee;
use crate::combat::modifiers::scale_ticks;
use crate::combat::reload;
use crate::combat::weapons::{FiringMode, WeaponInstance};
use crate::core::error::{CombatError, Result};
use crate::core::types::{EntityId, Tick};
use crate::simulation::command::{Command, Progression};
use crate::simulation::context::SimulationContext;

fn weapon_for(combatant: &Combatant, purpose: Progression) -> Option<&WeaponInstance> {
    match purpose {
        Progression::Attack => combatant.ranged_weapon.as_ref(),
        Progression::Melee => combatant.melee_weapon.as_ref(),
        Progression::Ready => combatant.active_weapon(),
    }
}

fn weapon_for_mut(combatant: &mut Combatant, purpose: Progression) -> Option<&mut WeaponInstance> {
    match purpose {
        Progression::Attack => combatant.ranged_weapon.as_mut(),
        Progression::Melee => combatant.melee_weapon.as_mut(),
        Progression::Ready => combatant.active_weapon_mut(),
    }
}

/// Begin an attack on `target` (or the current target, or an automatically
/// acquired one)
///
/// Returns false without side effects when the attacker is down, already
/// attacking, or has nobody to attack.
pub fn start_attack_sequence(
    ctx: &mut SimulationContext,
    id: EntityId,
    target: Option<EntityId>,
) -> Result<bool> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    if combatant.incapacitated {
        return Ok(false);
    }
    let record = ctx.states.get(id);
    if record.is_some_and(|r| r.attack.is_attacking || r.reload.is_some()) {
        tracing::debug!(entity = %id, "busy, attack not started");
        return Ok(false);
    }

    let target = match target.or_else(|| record.and_then(|r| r.targets.current)) {
        Some(target) => Some(target),
        None if combatant.automatic_targeting => {
            ctx.targeting.find_nearest_hostile(combatant, &ctx.roster)
        }
        None => None,
    };
    let Some(target) = target.filter(|t| *t != id && ctx.roster.contains(*t)) else {
        tracing::debug!(entity = %id, "no target to attack");
        return Ok(false);
    };

    let facing = ctx
        .roster
        .get(target)
        .map(|t| combatant.position.bearing_to(&t.position));
    let melee_mode = combatant.melee_mode;

    let record = ctx.states.entry(id);
    record.burst.reset();
    record.attack.is_attacking = true;
    let new_target = record.targets.previous != Some(target);
    if new_target {
        record.attack.shots_in_sequence = 0;
        record.targets.previous = Some(target);
    }
    record.targets.current = Some(target);
    if facing.is_some() {
        record.attack.last_target_facing = facing;
    }

    if let Some(combatant) = ctx.roster.get_mut(id) {
        combatant.statistics.attacks_started += 1;
        if new_target {
            combatant.statistics.targets_engaged += 1;
        }
        if facing.is_some() {
            combatant.facing = facing;
        }
    }

    tracing::debug!(entity = %id, target = %target, melee = melee_mode, tick = ctx.now(), "attack sequence started");

    let started = if melee_mode {
        melee::start_melee_attack(ctx, id, target)
    } else {
        schedule_attack_from_current_state(ctx, id)
    };
    if let Err(e) = started {
        ctx.states.entry(id).attack.is_attacking = false;
        return Err(e);
    }
    Ok(true)
}

enum AttackStep {
    InFlight,
    Advance,
    Fire { target: EntityId, delay: Tick, extra_time: bool },
}

/// Decide the next step of a ranged attack from wherever the weapon stands
pub fn schedule_attack_from_current_state(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let earned = aiming::earned_bonus(ctx, id);
    ctx.states.ensure(id);

    let step = {
        let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
        let weapon = combatant.ranged_weapon.as_ref().ok_or(CombatError::NoWeapon(id))?;
        let record = ctx.states.get(id).ok_or(CombatError::EntityNotFound(id))?;
        let state = weapon.state();
        let from_aim = record.hold.fires_from_aiming;

        if state == STATE_FIRING || state == STATE_RECOVERING {
            AttackStep::InFlight
        } else if state == STATE_AIMING || (state == STATE_POINTED_FROM_HIP && !from_aim) {
            let target = record.targets.current.ok_or(CombatError::EntityNotFound(id))?;
            let preferred = if from_aim { STATE_AIMING } else { STATE_POINTED_FROM_HIP };
            let dwell = if state == STATE_AIMING {
                record.aim.aiming_duration(now)
            } else {
                record.aim.pointing_duration(now)
            };

            if state == preferred && dwell >= ctx.config.fast_path_min_dwell_ticks {
                AttackStep::Fire {
                    target,
                    delay: FAST_PATH_FIRE_DELAY,
                    extra_time: false,
                }
            } else {
                let base = weapon.state_definition()?.base_ticks;
                if state == STATE_AIMING {
                    let speed = aiming_speed_for_shot(combatant, record);
                    let delay = scale_ticks(
                        base,
                        speed.timing_multiplier() * combatant.aiming_multiplier(),
                    );
                    AttackStep::Fire {
                        target,
                        delay,
                        extra_time: speed.adds_extra_time()
                            || earned == AimingBonusTier::VeryCareful,
                    }
                } else {
                    AttackStep::Fire {
                        target,
                        delay: base,
                        extra_time: false,
                    }
                }
            }
        } else {
            AttackStep::Advance
        }
    };

    match step {
        AttackStep::InFlight => Ok(()),
        AttackStep::Advance => advance_toward_successor(ctx, id, Progression::Attack),
        AttackStep::Fire {
            target,
            delay,
            extra_time,
        } => {
            let extra = if extra_time {
                let min = ctx.config.very_careful_extra_min_ticks;
                let max = ctx.config.very_careful_extra_max_ticks.max(min);
                ctx.rng.gen_range(min..=max)
            } else {
                0
            };
            schedule_firing(ctx, id, target, now + delay + extra);
            Ok(())
        }
    }
}

/// Schedule the next edge out of the current state
///
/// Preparation states dwell for `base × weapon-ready multiplier`, others for
/// their base duration. An attack whose next edge is `firing` schedules the
/// shot itself. A successor naming a missing state drops the weapon back to
/// its ready state and progression resumes from there.
pub(crate) fn advance_toward_successor(
    ctx: &mut SimulationContext,
    id: EntityId,
    purpose: Progression,
) -> Result<()> {
    let now = ctx.now();
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = weapon_for(combatant, purpose).ok_or(CombatError::NoWeapon(id))?;
    let current = weapon.state_definition()?;

    let duration = if is_preparation_state(&current.name) {
        scale_ticks(current.base_ticks, combatant.weapon_ready_multiplier())
    } else {
        current.base_ticks
    };

    if let Some(next) = weapon.graph().successor_of(&current.name) {
        let next = next.name.clone();
        if purpose == Progression::Attack && next == STATE_FIRING {
            let target = ctx
                .states
                .get(id)
                .and_then(|r| r.targets.current)
                .ok_or(CombatError::EntityNotFound(id))?;
            schedule_firing(ctx, id, target, now + duration);
        } else {
            tracing::debug!(entity = %id, from = %current.name, to = %next, due = now + duration, "weapon transition scheduled");
            ctx.scheduler
                .schedule(now + duration, id, Command::AdvanceWeaponState { to: next, purpose });
        }
        return Ok(());
    }

    let weapon_id = weapon.definition().id.clone();
    let Some(dangling) = current.successor.clone() else {
        return Err(CombatError::MissingState {
            weapon: weapon_id,
            state: format!("successor of '{}'", current.name),
        });
    };
    let from = current.name.clone();

    tracing::warn!(entity = %id, weapon = %weapon_id, state = %from, successor = %dangling, "successor missing, falling back to ready");
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = weapon_for_mut(combatant, purpose).ok_or(CombatError::NoWeapon(id))?;
    let ready = weapon.fall_back_to_ready()?;
    if ready == from {
        return Err(CombatError::MissingState {
            weapon: weapon_id,
            state: dangling,
        });
    }
    ctx.states.entry(id).aim.enter_posture(&ready, now);
    continue_progression(ctx, id, purpose)
}

fn continue_progression(ctx: &mut SimulationContext, id: EntityId, purpose: Progression) -> Result<()> {
    match purpose {
        Progression::Attack => {
            if ctx.states.get(id).is_some_and(|r| r.attack.is_attacking) {
                schedule_attack_from_current_state(ctx, id)
            } else {
                Ok(())
            }
        }
        Progression::Ready => schedule_ready_from_current_state(ctx, id),
        Progression::Melee => melee::schedule_melee_from_current_state(ctx, id),
    }
}

/// Handler for `Command::AdvanceWeaponState`
pub(crate) fn enter_successor_state(
    ctx: &mut SimulationContext,
    id: EntityId,
    to: &str,
    purpose: Progression,
) -> Result<()> {
    let now = ctx.now();
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = weapon_for_mut(combatant, purpose).ok_or(CombatError::NoWeapon(id))?;

    let expected = weapon.graph().successor_of(weapon.state()).map(|s| s.name.as_str());
    if expected != Some(to) {
        tracing::debug!(entity = %id, state = weapon.state(), to, "stale transition dropped");
        return Ok(());
    }

    weapon.enter_state(to)?;
    ctx.states.entry(id).aim.enter_posture(to, now);
    tracing::debug!(entity = %id, state = to, tick = now, "weapon state entered");

    continue_progression(ctx, id, purpose)
}

/// Queue a shot at `fire_tick`, ignoring a second request for the same tick
pub fn schedule_firing(ctx: &mut SimulationContext, id: EntityId, target: EntityId, fire_tick: Tick) {
    let record = ctx.states.entry(id);
    if record.attack.last_firing_scheduled_tick == Some(fire_tick) {
        tracing::debug!(entity = %id, fire_tick, "duplicate firing schedule ignored");
        return;
    }
    record.attack.last_firing_scheduled_tick = Some(fire_tick);
    let handle = ctx.scheduler.schedule(fire_tick, id, Command::Fire { target });
    tracing::debug!(entity = %id, target = %target, due = handle.due, "firing scheduled");
}

/// Handler for `Command::Fire`: the first round of a trigger pull
pub(crate) fn execute_fire(ctx: &mut SimulationContext, id: EntityId, target: EntityId) -> Result<()> {
    let now = ctx.now();
    if !ctx.roster.contains(target) {
        tracing::debug!(shooter = %id, target = %target, "target gone before the shot");
        return end_attack_sequence(ctx, id);
    }
    let earned = aiming::earned_bonus(ctx, id);
    let units_per_foot = ctx.config.units_per_foot;
    let target_position = ctx.roster.get(target).map(|t| t.position);

    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    weapon.enter_state(STATE_FIRING)?;
    let firing_ticks = weapon.state_definition()?.base_ticks;
    let recovering_ticks = weapon
        .graph()
        .get(STATE_RECOVERING)
        .map(|s| s.base_ticks)
        .ok_or_else(|| CombatError::MissingState {
            weapon: weapon.definition().id.clone(),
            state: STATE_RECOVERING.to_string(),
        })?;
    ctx.states.entry(id).aim.reset();

    let mode = weapon.firing_mode();
    let fired = weapon.consume_round();
    if fired {
        combatant.statistics.shots_fired += 1;
        let definition = weapon.definition();
        ctx.effects.play_weapon_sound(id, definition, now);
        ctx.effects.apply_firing_highlight(id, now);
        ctx.effects.add_muzzle_flash(id, now);
        if let Some(position) = target_position {
            ctx.effects.schedule_projectile_impact(ProjectileShot {
                shooter: id,
                target,
                weapon_id: definition.id.clone(),
                fire_tick: now,
                distance_feet: combatant.position.distance(&position) / units_per_foot,
                burst_shot: 1,
                burst_penalty: false,
                aiming_bonus: earned,
            });
        }
        tracing::info!(
            shooter = %id,
            target = %target,
            tick = now,
            ammo = weapon.ammunition(),
            bonus = ?earned,
            "shot fired"
        );
    } else {
        tracing::info!(shooter = %id, tick = now, "trigger pulled on an empty weapon");
    }

    if fired {
        match mode {
            FiringMode::Burst => burst::schedule_burst_shots(ctx, id, target, now)?,
            FiringMode::FullAuto => burst::begin_full_auto(ctx, id, target, now)?,
            FiringMode::SingleShot => {}
        }
    }

    ctx.scheduler.schedule(now + firing_ticks, id, Command::BeginRecovery);
    ctx.scheduler
        .schedule(now + firing_ticks + recovering_ticks, id, Command::FinishRecovery);
    Ok(())
}

/// Handler for `Command::BeginRecovery`
pub(crate) fn begin_recovery(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    if weapon.is_in(STATE_FIRING) {
        weapon.enter_state(STATE_RECOVERING)?;
    }
    Ok(())
}

/// Handler for `Command::FinishRecovery`
///
/// The weapon returns to the preferred firing posture. A multiple-shot
/// sequence fires its next aimed shot; otherwise the attack ends, unless a
/// full-auto string is still running and will end it.
pub(crate) fn finish_recovery(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let default_aiming_ticks = ctx.config.default_aiming_ticks;
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let record = ctx.states.entry(id);
    let weapon = combatant.ranged_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    if !weapon.is_in(STATE_RECOVERING) && !weapon.is_in(STATE_FIRING) {
        tracing::debug!(entity = %id, state = weapon.state(), "stale recovery dropped");
        return Ok(());
    }

    let posture = if record.hold.fires_from_aiming {
        STATE_AIMING
    } else {
        STATE_POINTED_FROM_HIP
    };
    if weapon.graph().contains(posture) {
        weapon.enter_state(posture)?;
        record.aim.enter_posture(posture, now);
    } else {
        let ready = weapon.fall_back_to_ready()?;
        record.aim.enter_posture(&ready, now);
    }

    if record.burst.automatic_firing {
        // A burst closes the sequence here and paces its own follow-up; a
        // full-auto string closes it when it stops.
        if weapon.firing_mode() == FiringMode::Burst {
            return end_attack_sequence(ctx, id);
        }
        return Ok(());
    }

    record.attack.shots_in_sequence += 1;
    let shots_fired = record.attack.shots_in_sequence;
    let target = record.targets.current;
    let wants_more = combatant.multiple_shot_count > 1
        && shots_fired < combatant.multiple_shot_count
        && !weapon.is_empty();

    if let (true, Some(target)) = (wants_more, target) {
        if ctx.roster.contains(target) {
            let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
            let base = combatant
                .ranged_weapon
                .as_ref()
                .and_then(|w| w.graph().get(STATE_AIMING))
                .map(|s| s.base_ticks)
                .unwrap_or(default_aiming_ticks);
            let delay = scale_ticks(
                base,
                AimingSpeed::Quick.timing_multiplier() * combatant.aiming_multiplier(),
            );
            tracing::debug!(entity = %id, shot = shots_fired + 1, "next shot of sequence");
            schedule_firing(ctx, id, target, now + delay);
            return Ok(());
        }
    }

    end_attack_sequence(ctx, id)
}

/// Close the current attack sequence and decide what comes next
pub(crate) fn end_attack_sequence(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let record = ctx.states.entry(id);
    record.attack.is_attacking = false;
    record.attack.shots_in_sequence = 0;
    tracing::debug!(entity = %id, tick = ctx.now(), "attack sequence ended");

    if reload::needs_reload(ctx, id) && reload::start_reload(ctx, id)? {
        return Ok(());
    }
    continuation::check_continuous_attack(ctx, id)
}

/// Walk the active weapon towards ready, or towards the pinned hold state
pub fn start_ready_sequence(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    schedule_ready_from_current_state(ctx, id)
}

pub(crate) fn schedule_ready_from_current_state(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.active_weapon().ok_or(CombatError::NoWeapon(id))?;
    let record = ctx.states.entry(id);

    let goal = match &record.hold.target_hold_state {
        Some(pinned) => pinned.clone(),
        None if combatant.melee_mode => STATE_MELEE_READY.to_string(),
        None => STATE_READY.to_string(),
    };

    if weapon.is_in(&goal) {
        if record.hold.target_hold_state.take().is_some() {
            tracing::debug!(entity = %id, state = %goal, "reached hold state");
        }
        return Ok(());
    }

    if !weapon.graph().contains(&goal) {
        return Err(CombatError::MissingState {
            weapon: weapon.definition().id.clone(),
            state: goal,
        });
    }

    // Readying never passes through a shot: lower straight back to ready
    let next_is_shot = weapon
        .graph()
        .successor_of(weapon.state())
        .is_some_and(|next| next.name == STATE_FIRING || next.name == STATE_RECOVERING);
    if next_is_shot || weapon.is_in(STATE_FIRING) || weapon.is_in(STATE_RECOVERING) {
        let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
        let weapon = combatant.active_weapon_mut().ok_or(CombatError::NoWeapon(id))?;
        let ready = weapon.fall_back_to_ready()?;
        ctx.states.entry(id).aim.enter_posture(&ready, now);
        if ready == goal {
            ctx.states.entry(id).hold.target_hold_state = None;
            return Ok(());
        }
        return schedule_ready_from_current_state(ctx, id);
    }

    advance_toward_successor(ctx, id, Progression::Ready)
}

/// Pin progression at `state` and start readying towards it
pub fn progress_to_hold_state(ctx: &mut SimulationContext, id: EntityId, state: &str) -> Result<()> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.active_weapon().ok_or(CombatError::NoWeapon(id))?;
    if !weapon.graph().hold_candidates().any(|s| s.name == state) {
        return Err(CombatError::MissingState {
            weapon: weapon.definition().id.clone(),
            state: state.to_string(),
        });
    }
    let record = ctx.states.entry(id);
    record.hold.hold_state = Some(state.to_string());
    record.hold.target_hold_state = Some(state.to_string());
    schedule_ready_from_current_state(ctx, id)
}

/// Step the preferred hold state through the weapon's holdable states
pub fn cycle_hold_state(ctx: &mut SimulationContext, id: EntityId) -> Result<String> {
    let combatant = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.active_weapon().ok_or(CombatError::NoWeapon(id))?;
    let candidates: Vec<&str> = weapon.graph().hold_candidates().map(|s| s.name.as_str()).collect();
    let record = ctx.states.entry(id);

    let next = match candidates.iter().position(|name| *name == record.hold.hold_state()) {
        Some(pos) => candidates[(pos + 1) % candidates.len()],
        None => candidates.first().copied().ok_or_else(|| CombatError::MissingState {
            weapon: weapon.definition().id.clone(),
            state: "any holdable state".to_string(),
        })?,
    };

    record.hold.hold_state = Some(next.to_string());
    tracing::debug!(entity = %id, hold = next, "hold state cycled");
    Ok(next.to_string())
}

/// Step the ranged weapon to its next firing mode
pub fn cycle_firing_mode(ctx: &mut SimulationContext, id: EntityId) -> Result<FiringMode> {
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let weapon = combatant.ranged_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    let mode = weapon.cycle_firing_mode();
    tracing::debug!(entity = %id, mode = ?mode, "firing mode cycled");
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::catalog::WeaponCatalog;
    use crate::core::config::CombatConfig;
    use crate::core::types::FactionId;

    fn pistolero(ctx: &mut SimulationContext) -> EntityId {
        let weapon = WeaponCatalog::with_defaults()
            .instantiate("colt_peacemaker")
            .expect("colt");
        ctx.add_combatant(Combatant::new(EntityId(1), "P", FactionId(0)).with_ranged_weapon(weapon))
    }

    #[test]
    fn test_duplicate_firing_schedule_ignored() {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        let id = pistolero(&mut ctx);
        schedule_firing(&mut ctx, id, EntityId(9), 40);
        schedule_firing(&mut ctx, id, EntityId(9), 40);
        schedule_firing(&mut ctx, id, EntityId(9), 41);
        assert_eq!(ctx.scheduler.pending_for(id).len(), 2);
    }

    #[test]
    fn test_stale_transition_dropped() {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        let id = pistolero(&mut ctx);
        enter_successor_state(&mut ctx, id, "aiming", Progression::Ready).expect("dropped quietly");
        let state = ctx.combatant(id).and_then(|c| c.active_weapon()).map(|w| w.state().to_string());
        assert_eq!(state.as_deref(), Some("holstered"));
        assert!(ctx.scheduler.is_empty());
    }

    #[test]
    fn test_attack_without_target_refused() {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        let id = pistolero(&mut ctx);
        assert!(!start_attack_sequence(&mut ctx, id, None).expect("no target"));
        assert!(!start_attack_sequence(&mut ctx, id, Some(id)).expect("self"));
        assert!(ctx.record(id).is_some_and(|r| !r.attack.is_attacking));
    }
}
