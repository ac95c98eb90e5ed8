//! Reload sequencing
//!
//! Single-round weapons load one cartridge per completion and reschedule
//! until full; magazine weapons fill in one go. A reload in progress blocks
//! reactions and sustained-fire continuation.

use serde::{Deserialize, Serialize};

use crate::combat::constants::{RELOADABLE_STATES, STATE_RELOADING};
use crate::combat::continuation;
use crate::combat::modifiers::scale_ticks;
use crate::combat::weapons::{ReloadType, WeaponInstance};
use crate::core::error::{CombatError, Result};
use crate::core::types::{EntityId, Tick};
use crate::simulation::command::Command;
use crate::simulation::context::SimulationContext;

/// Timing of the reload step currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadProgress {
    pub started_at: Tick,
    pub completes_at: Tick,
}

impl ReloadProgress {
    /// Fraction of the current step done at `now`, in `[0, 1]`
    pub fn fraction(&self, now: Tick) -> f64 {
        let span = self.completes_at.saturating_sub(self.started_at);
        if span == 0 {
            return 1.0;
        }
        (now.saturating_sub(self.started_at) as f64 / span as f64).clamp(0.0, 1.0)
    }
}

/// Ranged weapon with room in the magazine, held in a state that allows reloading
pub fn can_reload(weapon: &WeaponInstance) -> bool {
    !weapon.definition().is_melee()
        && !weapon.is_full()
        && RELOADABLE_STATES.contains(&weapon.state())
        && weapon.graph().contains(STATE_RELOADING)
}

pub fn is_reloading(ctx: &SimulationContext, id: EntityId) -> bool {
    ctx.states.get(id).is_some_and(|r| r.reload.is_some())
}

/// Empty ranged weapon in use that could be reloaded right now
pub(crate) fn needs_reload(ctx: &SimulationContext, id: EntityId) -> bool {
    ctx.roster
        .get(id)
        .filter(|c| !c.melee_mode)
        .and_then(|c| c.ranged_weapon.as_ref())
        .is_some_and(|w| w.is_empty() && can_reload(w))
        && !is_reloading(ctx, id)
}

/// Begin reloading the ranged weapon; false when already reloading or not possible
pub fn start_reload(ctx: &mut SimulationContext, id: EntityId) -> Result<bool> {
    let now = ctx.now();
    if is_reloading(ctx, id) {
        tracing::debug!(entity = %id, "already reloading");
        return Ok(false);
    }

    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let multiplier = combatant.reload_multiplier();
    let weapon = combatant.ranged_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;
    if !can_reload(weapon) {
        return Ok(false);
    }

    weapon.enter_state(STATE_RELOADING)?;
    let duration = scale_ticks(weapon.definition().reload_ticks, multiplier);
    let handle = ctx
        .scheduler
        .schedule(now + duration, id, Command::CompleteReloadStep);

    let record = ctx.states.entry(id);
    record.attack.is_attacking = false;
    record.burst.reset();
    record.aim.reset();
    record.reload = Some(ReloadProgress {
        started_at: now,
        completes_at: handle.due,
    });

    tracing::info!(
        entity = %id,
        weapon = %weapon.definition().id,
        ammo = weapon.ammunition(),
        completes_at = handle.due,
        "reload started"
    );
    Ok(true)
}

/// Handler for `Command::CompleteReloadStep`
pub(crate) fn complete_reload_step(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    if !is_reloading(ctx, id) {
        tracing::debug!(entity = %id, "stale reload step dropped");
        return Ok(());
    }

    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let multiplier = combatant.reload_multiplier();
    let weapon = combatant.ranged_weapon.as_mut().ok_or(CombatError::NoWeapon(id))?;

    let reload_type = weapon.definition().reload_type;
    match reload_type {
        ReloadType::SingleRound => {
            weapon.load_round();
        }
        ReloadType::FullMagazine => weapon.fill(),
    }
    tracing::debug!(entity = %id, ammo = weapon.ammunition(), tick = now, "reload step complete");

    if reload_type == ReloadType::SingleRound && !weapon.is_full() {
        let duration = scale_ticks(weapon.definition().reload_ticks, multiplier);
        let handle = ctx
            .scheduler
            .schedule(now + duration, id, Command::CompleteReloadStep);
        ctx.states.entry(id).reload = Some(ReloadProgress {
            started_at: now,
            completes_at: handle.due,
        });
        return Ok(());
    }

    let ready = weapon.fall_back_to_ready()?;
    combatant.statistics.reloads_completed += 1;
    let resume = combatant.persistent_attack || combatant.automatic_targeting;
    ctx.states.entry(id).reload = None;
    tracing::info!(entity = %id, state = %ready, tick = now, "reload complete");

    if resume {
        continuation::check_continuous_attack(ctx, id)?;
    }
    Ok(())
}

/// Abort a reload in progress
///
/// Drops every pending action of the combatant and puts the weapon back in
/// its ready state. Rounds already loaded stay loaded. Returns false when no
/// reload was running.
pub fn cancel_reload(ctx: &mut SimulationContext, id: EntityId) -> Result<bool> {
    if !is_reloading(ctx, id) {
        return Ok(false);
    }
    ctx.states.entry(id).reload = None;
    let cancelled = ctx.scheduler.cancel_all_for_owner(id);

    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    if let Some(weapon) = combatant.ranged_weapon.as_mut() {
        if weapon.is_in(STATE_RELOADING) {
            weapon.fall_back_to_ready()?;
        }
    }
    tracing::info!(entity = %id, cancelled, "reload cancelled");
    Ok(true)
}

/// Progress of the current reload step, if one is running
pub fn reload_progress(ctx: &SimulationContext, id: EntityId) -> Option<f64> {
    let now = ctx.now();
    ctx.states
        .get(id)
        .and_then(|r| r.reload)
        .map(|progress| progress.fraction(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        let progress = ReloadProgress {
            started_at: 100,
            completes_at: 120,
        };
        assert_eq!(progress.fraction(100), 0.0);
        assert_eq!(progress.fraction(110), 0.5);
        assert_eq!(progress.fraction(500), 1.0);
        assert_eq!(progress.fraction(50), 0.0);
    }

    #[test]
    fn test_zero_length_step_is_done() {
        let progress = ReloadProgress {
            started_at: 7,
            completes_at: 7,
        };
        assert_eq!(progress.fraction(7), 1.0);
    }
}
