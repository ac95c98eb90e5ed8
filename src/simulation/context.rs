//! Simulation context - owns every piece of combat state
//!
//! Constructed once per simulation and passed by reference through the tick
//! loop and every controller.

use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::combat::combatant::{Combatant, Roster};
use crate::combat::effects::{EffectsSink, NullEffects};
use crate::combat::state::{CombatRecord, CombatStateTable};
use crate::combat::targeting::{NearestHostile, TargetingService};
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::{EntityId, Tick};
use crate::simulation::clock::Clock;
use crate::simulation::scheduler::Scheduler;
use crate::simulation::tick::{run_simulation_tick, TickReport};

pub struct SimulationContext {
    pub clock: Clock,
    pub scheduler: Scheduler,
    pub roster: Roster,
    pub states: CombatStateTable,
    pub config: CombatConfig,
    /// Single source of randomness; seeded from the config
    pub rng: ChaCha8Rng,
    pub(crate) effects: Box<dyn EffectsSink>,
    pub(crate) targeting: Box<dyn TargetingService>,
}

impl SimulationContext {
    pub fn new(config: CombatConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self {
            clock: Clock::new(),
            scheduler: Scheduler::new(),
            roster: Roster::new(),
            states: CombatStateTable::new(),
            config,
            rng,
            effects: Box::new(NullEffects),
            targeting: Box::new(NearestHostile),
        }
    }

    /// Validate the configuration before building the context
    pub fn try_new(config: CombatConfig) -> Result<Self> {
        config.validate().map_err(CombatError::InvalidConfig)?;
        Ok(Self::new(config))
    }

    pub fn with_effects(mut self, effects: impl EffectsSink + 'static) -> Self {
        self.effects = Box::new(effects);
        self
    }

    pub fn with_targeting(mut self, targeting: impl TargetingService + 'static) -> Self {
        self.targeting = Box::new(targeting);
        self
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Add a combatant and create its combat record
    pub fn add_combatant(&mut self, combatant: Combatant) -> EntityId {
        let id = combatant.id;
        self.states.ensure(id);
        self.roster.insert(combatant);
        tracing::debug!(entity = %id, "combatant added");
        id
    }

    /// Remove a combatant together with its state and pending actions
    pub fn remove_combatant(&mut self, id: EntityId) -> Option<Combatant> {
        self.cleanup(id);
        self.roster.remove(id)
    }

    /// Drop the combat record and cancel everything the owner has scheduled
    pub fn cleanup(&mut self, id: EntityId) {
        self.states.cleanup(id);
        self.scheduler.cancel_all_for_owner(id);
    }

    pub fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.roster.get(id)
    }

    pub fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.roster.get_mut(id)
    }

    pub fn record(&self, id: EntityId) -> Option<&CombatRecord> {
        self.states.get(id)
    }

    /// Mark a combatant as down (or back up); hit resolution lives elsewhere
    pub fn set_incapacitated(&mut self, id: EntityId, incapacitated: bool) -> Result<()> {
        let combatant = self.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
        combatant.incapacitated = incapacitated;
        if incapacitated {
            tracing::info!(entity = %id, name = %combatant.name, "combatant incapacitated");
        }
        Ok(())
    }

    /// Advance one tick and run everything due
    pub fn step(&mut self) -> TickReport {
        run_simulation_tick(self)
    }

    /// Run `ticks` steps; returns the number of actions executed
    pub fn run_ticks(&mut self, ticks: u64) -> usize {
        (0..ticks).map(|_| self.step().actions_executed).sum()
    }

    /// Step until the clock reads `tick`
    pub fn run_until(&mut self, tick: Tick) -> usize {
        let mut executed = 0;
        while self.now() < tick {
            executed += self.step().actions_executed;
        }
        executed
    }
}

impl std::fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationContext")
            .field("tick", &self.clock.now())
            .field("combatants", &self.roster.len())
            .field("pending_actions", &self.scheduler.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FactionId;
    use crate::simulation::command::Command;

    #[test]
    fn test_add_combatant_creates_record() {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        let id = ctx.add_combatant(Combatant::new(EntityId(1), "Ada", FactionId(0)));
        assert!(ctx.record(id).is_some());
        assert_eq!(ctx.combatant(id).map(|c| c.name.as_str()), Some("Ada"));
    }

    #[test]
    fn test_remove_combatant_cancels_its_actions() {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        let a = ctx.add_combatant(Combatant::new(EntityId(1), "A", FactionId(0)));
        let b = ctx.add_combatant(Combatant::new(EntityId(2), "B", FactionId(1)));
        ctx.scheduler.schedule(10, a, Command::Retarget);
        ctx.scheduler.schedule(10, b, Command::Retarget);

        assert!(ctx.remove_combatant(a).is_some());
        assert!(ctx.record(a).is_none());
        assert_eq!(ctx.scheduler.len(), 1);
    }

    #[test]
    fn test_try_new_rejects_bad_config() {
        let config = CombatConfig {
            units_per_foot: 0.0,
            ..Default::default()
        };
        assert!(matches!(SimulationContext::try_new(config), Err(CombatError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_until_reaches_tick() {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        ctx.run_until(25);
        assert_eq!(ctx.now(), 25);
        ctx.run_ticks(5);
        assert_eq!(ctx.now(), 30);
    }

    #[test]
    fn test_same_seed_same_rng_stream() {
        use rand::Rng;
        let mut a = SimulationContext::new(CombatConfig::default());
        let mut b = SimulationContext::new(CombatConfig::default());
        let xs: Vec<u32> = (0..5).map(|_| a.rng.gen_range(0..1000)).collect();
        let ys: Vec<u32> = (0..5).map(|_| b.rng.gen_range(0..1000)).collect();
        assert_eq!(xs, ys);
    }
}
