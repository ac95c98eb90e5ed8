pub mod aiming;
pub mod burst;
pub mod catalog;
pub mod combatant;
pub mod constants;
pub mod continuation;
pub mod defense;
pub mod effects;
pub mod melee;
pub mod modifiers;
pub mod reaction;
pub mod reload;
pub mod skill;
pub mod state;
pub mod targeting;
pub mod transition;
pub mod weapons;

pub use aiming::{AimTimer, AimingBonusTier, AimingSpeed};
pub use burst::BurstTracker;
pub use catalog::WeaponCatalog;
pub use combatant::{Attributes, CombatStatistics, Combatant, Roster};
pub use defense::{BlockOutcome, DefenseState, DefenseTracker};
pub use effects::{EffectEvent, EffectLog, EffectsSink, NullEffects, ProjectileShot};
pub use reaction::ReactionWatch;
pub use reload::ReloadProgress;
pub use skill::{SkillKind, SkillSet};
pub use state::{CombatRecord, CombatStateTable};
pub use targeting::{NearestHostile, TargetingService};
pub use transition::start_attack_sequence;
pub use weapons::{
    FiringMode, MeleeReach, ReloadType, WeaponCategory, WeaponDefinition, WeaponInstance,
    WeaponStateDefinition, WeaponStateGraph,
};
