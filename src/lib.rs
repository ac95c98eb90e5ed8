//! Fireline - tick-driven tactical combat timing engine
//!
//! Weapons move through data-defined state graphs (draw, ready, aim, fire,
//! recover, reload) on a discrete tick clock. Every multi-step sequence is a
//! chain of scheduled commands owned by one combatant, so a whole skirmish
//! replays identically from the same seed.

pub mod combat;
pub mod core;
pub mod simulation;

pub use crate::core::{CombatConfig, CombatError, EntityId, FactionId, Result, Tick, Vec2};
pub use crate::simulation::SimulationContext;
