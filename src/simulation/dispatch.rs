//! Command dispatcher
//!
//! Interprets a due `ScheduledAction` against the context as it stands when
//! the action runs. A failing action is logged and dropped; it never stops
//! the drain or touches other combatants' queues.

use crate::combat::{burst, continuation, melee, reaction, reload, transition};
use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::simulation::command::Command;
use crate::simulation::context::SimulationContext;
use crate::simulation::scheduler::ScheduledAction;

pub(crate) fn dispatch(ctx: &mut SimulationContext, action: ScheduledAction) {
    let ScheduledAction { owner, command, .. } = action;
    if !ctx.roster.contains(owner) {
        tracing::debug!(owner = %owner, command = command.kind(), "owner removed, action dropped");
        return;
    }

    let kind = command.kind();
    if let Err(e) = execute(ctx, owner, command) {
        tracing::warn!(owner = %owner, tick = ctx.now(), command = kind, "scheduled action aborted: {}", e);
    }
}

fn execute(ctx: &mut SimulationContext, owner: EntityId, command: Command) -> Result<()> {
    match command {
        Command::AdvanceWeaponState { to, purpose } => {
            transition::enter_successor_state(ctx, owner, &to, purpose)
        }
        Command::Fire { target } => transition::execute_fire(ctx, owner, target),
        Command::BeginRecovery => transition::begin_recovery(ctx, owner),
        Command::FinishRecovery => transition::finish_recovery(ctx, owner),
        Command::BurstShot { target, shot } => burst::fire_burst_shot(ctx, owner, target, shot),
        Command::FullAutoShot { target } => burst::fire_full_auto_shot(ctx, owner, target),
        Command::ResumeAfterBurst => burst::resume_after_burst(ctx, owner),
        Command::ContinueStandardAttack => burst::resume_sustained_fire(ctx, owner),
        Command::CompleteReloadStep => reload::complete_reload_step(ctx, owner),
        Command::ReactionTrigger => reaction::trigger_reaction(ctx, owner),
        Command::Retarget => continuation::perform_automatic_target_change(ctx, owner),
        Command::MeleeRangeCheck { target } => melee::recheck_melee_range(ctx, owner, target),
        Command::MeleeStrike { target } => melee::execute_melee_strike(ctx, owner, target),
        Command::MeleeRecover => melee::recover_from_strike(ctx, owner),
    }
}
