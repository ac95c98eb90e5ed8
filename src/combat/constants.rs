//! Combat timing constants - well-known state names and formula factors
//!
//! Weapon graphs are data, but the controllers key their behavior off a
//! handful of state names. Tunable durations live in `CombatConfig`.

// Weapon states the controllers recognise
pub const STATE_READY: &str = "ready";
pub const STATE_AIMING: &str = "aiming";
pub const STATE_POINTED_FROM_HIP: &str = "pointedfromhip";
pub const STATE_FIRING: &str = "firing";
pub const STATE_RECOVERING: &str = "recovering";
pub const STATE_RELOADING: &str = "reloading";
pub const STATE_MELEE_READY: &str = "melee_ready";
pub const STATE_MELEE_ATTACKING: &str = "melee_attacking";

/// States whose dwell time is shortened by the weapon-ready speed multiplier
pub const PREPARATION_STATES: [&str; 5] = ["drawing", "unsheathing", "unsling", STATE_READY, STATE_MELEE_READY];

/// States a hold-state cycle skips (transient, never held)
pub const TRANSIENT_STATES: [&str; 3] = [STATE_FIRING, STATE_RECOVERING, STATE_RELOADING];

/// States from which a reload may begin
pub const RELOADABLE_STATES: [&str; 3] = [STATE_READY, STATE_AIMING, STATE_RECOVERING];

// Speed factor slopes (per modifier point / per skill level)
pub const WEAPON_READY_REFLEX_SLOPE: f64 = 0.015;
pub const QUICKDRAW_SLOPE: f64 = 0.08;
pub const RELOAD_REFLEX_SLOPE: f64 = 0.01;
pub const AIMING_REFLEX_SLOPE: f64 = 0.01;
pub const AIMING_QUICKDRAW_SLOPE: f64 = 0.05;
/// Share of the aiming-ready bonus that carries over to aim time
pub const AIMING_BONUS_SHARE: f64 = 0.25;

/// Delay for shots that take the fast path
pub const FAST_PATH_FIRE_DELAY: u64 = 1;

/// Defense value contributed per weapon skill level
pub const DEFENSE_SKILL_WEIGHT: i32 = 5;
/// Upper bound of the defense value die roll
pub const DEFENSE_ROLL_MAX: i32 = 50;

/// Base reach for melee strikes, in feet, before weapon reach is added
pub const BASE_MELEE_REACH_FEET: f32 = 4.0;

pub fn is_preparation_state(name: &str) -> bool {
    PREPARATION_STATES.contains(&name)
}

pub fn is_transient_state(name: &str) -> bool {
    TRANSIENT_STATES.contains(&name)
}
