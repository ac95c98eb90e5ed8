//! Tick system - one step of the combat simulation
//!
//! Each step advances the clock, drains every due action in (tick, sequence)
//! order through the dispatcher, then lets every combatant's reaction
//! monitor look at the result.

use crate::combat::reaction;
use crate::core::types::Tick;
use crate::simulation::context::SimulationContext;
use crate::simulation::dispatch::dispatch;

/// Summary of one simulation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    pub actions_executed: usize,
}

/// Run a single simulation tick
pub fn run_simulation_tick(ctx: &mut SimulationContext) -> TickReport {
    let tick = ctx.clock.advance();
    ctx.scheduler.advance_to(tick);

    // Actions scheduled while draining for this same tick run before the step ends
    let mut actions_executed = 0;
    while let Some(action) = ctx.scheduler.pop_due(tick) {
        dispatch(ctx, action);
        actions_executed += 1;
    }

    reaction::monitor_all(ctx);

    if actions_executed > 0 {
        tracing::trace!(tick, actions_executed, pending = ctx.scheduler.len(), "tick complete");
    }
    TickReport {
        tick,
        actions_executed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CombatConfig;

    #[test]
    fn test_empty_tick_advances_clock() {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        let report = run_simulation_tick(&mut ctx);
        assert_eq!(report.tick, 1);
        assert_eq!(report.actions_executed, 0);
        assert_eq!(ctx.now(), 1);
    }
}
