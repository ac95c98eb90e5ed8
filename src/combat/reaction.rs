//! Reaction monitor
//!
//! A combatant may watch one target's weapon. Once the watched weapon leaves
//! the state it was in when the watch was set, a reactive attack is queued
//! after a reflex-dependent delay. A reactor that is busy attacking has the
//! reaction pushed back rather than dropped.

use serde::{Deserialize, Serialize};

use crate::combat::transition;
use crate::core::error::{CombatError, Result};
use crate::core::types::{EntityId, Tick};
use crate::simulation::command::Command;
use crate::simulation::context::SimulationContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionWatch {
    pub target: EntityId,
    /// Target's weapon state when the watch was set
    pub baseline_state: String,
    /// Set once a reaction has been queued
    pub trigger_tick: Option<Tick>,
}

/// `max(1, base − reflexes modifier)`
pub fn reaction_delay(base_ticks: i64, reflexes_modifier: i32) -> Tick {
    let delay = (base_ticks - i64::from(reflexes_modifier)).max(1);
    Tick::try_from(delay).unwrap_or(1)
}

/// Start watching `target`, snapshotting its current weapon state
pub fn set_reaction_target(ctx: &mut SimulationContext, id: EntityId, target: EntityId) -> Result<()> {
    if !ctx.roster.contains(id) {
        return Err(CombatError::EntityNotFound(id));
    }
    let watched = ctx.roster.get(target).ok_or(CombatError::EntityNotFound(target))?;
    let baseline = watched
        .active_weapon()
        .ok_or(CombatError::NoWeapon(target))?
        .state()
        .to_string();

    tracing::debug!(entity = %id, target = %target, baseline = %baseline, "reaction watch set");
    ctx.states.entry(id).reaction = Some(ReactionWatch {
        target,
        baseline_state: baseline,
        trigger_tick: None,
    });
    Ok(())
}

pub fn clear_reaction_target(ctx: &mut SimulationContext, id: EntityId) {
    if let Some(record) = ctx.states.get_mut(id) {
        record.reaction = None;
    }
}

/// Compare one watcher's target against its baseline and queue a reaction
/// on the first change
pub fn update_reaction_monitoring(ctx: &mut SimulationContext, id: EntityId) {
    let now = ctx.now();
    let Some(record) = ctx.states.get(id) else {
        return;
    };
    let Some(watch) = record.reaction.as_ref().filter(|w| w.trigger_tick.is_none()) else {
        return;
    };
    let Some(reactor) = ctx.roster.get(id) else {
        return;
    };
    if reactor.incapacitated || record.reload.is_some() {
        return;
    }

    let live_state = ctx
        .roster
        .get(watch.target)
        .map(|t| t.active_weapon().map(|w| w.state()));
    let changed = match live_state {
        None => {
            tracing::debug!(entity = %id, target = %watch.target, "watched target gone");
            ctx.states.entry(id).reaction = None;
            return;
        }
        Some(state) => state != Some(watch.baseline_state.as_str()),
    };
    if !changed {
        return;
    }

    let target = watch.target;
    let delay = reaction_delay(ctx.config.reaction_base_delay_ticks, reactor.reflexes_modifier());
    let handle = ctx.scheduler.schedule(now + delay, id, Command::ReactionTrigger);
    if let Some(watch) = ctx.states.entry(id).reaction.as_mut() {
        watch.trigger_tick = Some(handle.due);
    }
    tracing::info!(entity = %id, target = %target, due = handle.due, "reaction queued");
}

/// Run reaction monitoring for every combatant, in id order
pub fn monitor_all(ctx: &mut SimulationContext) {
    for id in ctx.roster.ids() {
        update_reaction_monitoring(ctx, id);
    }
}

/// Handler for `Command::ReactionTrigger`
pub(crate) fn trigger_reaction(ctx: &mut SimulationContext, id: EntityId) -> Result<()> {
    let now = ctx.now();
    let Some(watch) = ctx.states.get(id).and_then(|r| r.reaction.clone()) else {
        return Ok(());
    };
    let reactor = ctx.roster.get(id).ok_or(CombatError::EntityNotFound(id))?;

    if reactor.incapacitated || !ctx.roster.contains(watch.target) {
        clear_reaction_target(ctx, id);
        return Ok(());
    }

    let busy = ctx
        .states
        .get(id)
        .is_some_and(|r| r.attack.is_attacking || r.reload.is_some());
    if busy {
        let handle = ctx
            .scheduler
            .schedule(now + ctx.config.reaction_defer_ticks, id, Command::ReactionTrigger);
        if let Some(watch) = ctx.states.entry(id).reaction.as_mut() {
            watch.trigger_tick = Some(handle.due);
        }
        tracing::debug!(entity = %id, due = handle.due, "reaction deferred, reactor busy");
        return Ok(());
    }

    clear_reaction_target(ctx, id);
    tracing::info!(entity = %id, target = %watch.target, tick = now, "reacting");
    transition::start_attack_sequence(ctx, id, Some(watch.target))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_delay() {
        assert_eq!(reaction_delay(30, 0), 30);
        assert_eq!(reaction_delay(30, 5), 25);
        assert_eq!(reaction_delay(30, -10), 40);
        assert_eq!(reaction_delay(30, 20), 10);
        assert_eq!(reaction_delay(10, 20), 1);
    }
}
