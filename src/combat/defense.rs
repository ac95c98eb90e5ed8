//! Defense and counter-attack timing
//!
//! A defender cycles READY → DEFENDING → COOLDOWN → READY. Expiry of the
//! cooldown and of the counter-attack window is noticed lazily, the next
//! time either is queried.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::combatant::Combatant;
use crate::combat::constants::{DEFENSE_ROLL_MAX, DEFENSE_SKILL_WEIGHT};
use crate::core::error::{CombatError, Result};
use crate::core::types::{EntityId, Tick};
use crate::simulation::context::SimulationContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseState {
    #[default]
    Ready,
    Defending,
    Cooldown,
}

impl DefenseState {
    /// Restore from a stored name; anything unrecognised comes back as Ready
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "defending" => DefenseState::Defending,
            "cooldown" => DefenseState::Cooldown,
            _ => DefenseState::Ready,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DefenseState::Ready => "ready",
            DefenseState::Defending => "defending",
            DefenseState::Cooldown => "cooldown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseTracker {
    pub state: DefenseState,
    pub cooldown_end: Tick,
    pub counter_window_end: Tick,
    pub has_counter_opportunity: bool,
    /// Earliest tick for the next defense on the attack-driven path
    pub next_defense_tick: Tick,
}

impl DefenseTracker {
    /// Ready and out of cooldown; an elapsed cooldown flips back to Ready here
    pub fn can_defend(&mut self, now: Tick) -> bool {
        if self.state == DefenseState::Cooldown && now >= self.cooldown_end {
            self.state = DefenseState::Ready;
        }
        self.state == DefenseState::Ready && now >= self.cooldown_end
    }

    pub fn start_cooldown(&mut self, now: Tick, ticks: Tick) {
        self.state = DefenseState::Cooldown;
        self.cooldown_end = now + ticks;
    }

    pub fn open_counter_window(&mut self, now: Tick, ticks: Tick) {
        self.has_counter_opportunity = true;
        self.counter_window_end = now + ticks;
    }

    /// Window still open at `now`; an expired window is cleared here
    pub fn has_counter_opportunity(&mut self, now: Tick) -> bool {
        if self.has_counter_opportunity && now >= self.counter_window_end {
            self.has_counter_opportunity = false;
        }
        self.has_counter_opportunity
    }
}

/// Result of one block attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Blocking is switched off in the configuration
    Disabled,
    /// Defender is down or still cooling down
    Unavailable,
    Failed,
    /// Blocked; `defense_value` is subtracted from the attacker's roll
    Blocked { defense_value: i32 },
}

/// `1d50 + dexterity modifier + skill × 5 + weapon defense bonus`
pub fn calculate_defense_value<R: Rng + ?Sized>(rng: &mut R, defender: &Combatant) -> i32 {
    let roll = rng.gen_range(1..=DEFENSE_ROLL_MAX);
    let skill = i32::from(defender.active_weapon_skill());
    let bonus = defender
        .active_weapon()
        .map_or(0, |w| w.definition().defense_bonus);
    roll + defender.dexterity_modifier() + skill * DEFENSE_SKILL_WEIGHT + bonus
}

pub fn can_defend(ctx: &mut SimulationContext, id: EntityId) -> bool {
    let now = ctx.now();
    if !ctx.roster.is_active(id) {
        return false;
    }
    ctx.states.entry(id).defense.can_defend(now)
}

/// Current defense state, after any lazy cooldown expiry
pub fn defense_state(ctx: &mut SimulationContext, id: EntityId) -> DefenseState {
    let now = ctx.now();
    let tracker = &mut ctx.states.entry(id).defense;
    tracker.can_defend(now);
    tracker.state
}

/// Try to block an incoming attack from `attacker`
///
/// Every resolved attempt starts the defense cooldown, win or lose. Success
/// also opens a counter-attack window.
pub fn attempt_block(ctx: &mut SimulationContext, id: EntityId, attacker: EntityId) -> Result<BlockOutcome> {
    let now = ctx.now();
    if ctx.config.defensive_blocking_disabled {
        return Ok(BlockOutcome::Disabled);
    }
    if !can_defend(ctx, id) {
        return Ok(BlockOutcome::Unavailable);
    }

    let defender = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let tracker = &mut ctx.states.entry(id).defense;
    tracker.state = DefenseState::Defending;
    defender.statistics.defensive_attempts += 1;

    let blocked = ctx.rng.gen::<f64>() < ctx.config.block_success_chance;
    tracker.start_cooldown(now, ctx.config.defense_cooldown_ticks);

    if !blocked {
        tracing::debug!(defender = %id, attacker = %attacker, tick = now, "block failed");
        return Ok(BlockOutcome::Failed);
    }

    tracker.open_counter_window(now, ctx.config.counter_window_ticks);
    defender.statistics.defensive_successes += 1;
    let defense_value = calculate_defense_value(&mut ctx.rng, defender);
    tracing::info!(defender = %id, attacker = %attacker, defense_value, tick = now, "attack blocked");
    Ok(BlockOutcome::Blocked { defense_value })
}

pub fn has_counter_attack_opportunity(ctx: &mut SimulationContext, id: EntityId) -> bool {
    let now = ctx.now();
    ctx.states.entry(id).defense.has_counter_opportunity(now)
}

/// Spend the counter-attack opportunity against `attacker`
///
/// `None` when there is no open window; otherwise whether the counter landed.
/// Either way a fresh defense cooldown starts.
pub fn execute_counter_attack(
    ctx: &mut SimulationContext,
    id: EntityId,
    attacker: EntityId,
) -> Result<Option<bool>> {
    let now = ctx.now();
    if !ctx.roster.is_active(id) || !has_counter_attack_opportunity(ctx, id) {
        return Ok(None);
    }

    let defender = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let tracker = &mut ctx.states.entry(id).defense;
    tracker.has_counter_opportunity = false;
    tracker.start_cooldown(now, ctx.config.defense_cooldown_ticks);

    let landed = ctx.rng.gen::<f64>() < ctx.config.counter_success_chance;
    defender.statistics.counter_attacks_executed += 1;
    if landed {
        defender.statistics.counter_attacks_successful += 1;
    }
    tracing::info!(defender = %id, attacker = %attacker, landed, tick = now, "counter-attack");
    Ok(Some(landed))
}

/// Attack-driven path: standing and past `next_defense_tick`
pub fn can_defend_against_attack(ctx: &SimulationContext, id: EntityId) -> bool {
    let now = ctx.now();
    ctx.roster.is_active(id)
        && ctx
            .states
            .get(id)
            .map_or(true, |r| now >= r.defense.next_defense_tick)
}

/// Roll a defense against an incoming attack
///
/// Returns 0, leaving all state untouched, when the defender cannot defend
/// yet. Otherwise counts the attempt, spaces the next defense out and
/// returns the rolled value.
pub fn perform_defense(ctx: &mut SimulationContext, id: EntityId) -> Result<i32> {
    let now = ctx.now();
    if !can_defend_against_attack(ctx, id) {
        return Ok(0);
    }

    let defender = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let value = calculate_defense_value(&mut ctx.rng, defender);
    defender.statistics.defensive_attempts += 1;
    if value > 0 {
        defender.statistics.defensive_successes += 1;
    }
    ctx.states.entry(id).defense.next_defense_tick = now + ctx.config.next_defense_interval_ticks;
    tracing::debug!(defender = %id, value, tick = now, "defense rolled");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_expires_lazily() {
        let mut tracker = DefenseTracker::default();
        assert!(tracker.can_defend(0));

        tracker.start_cooldown(10, 60);
        assert_eq!(tracker.state, DefenseState::Cooldown);
        assert!(!tracker.can_defend(69));
        assert_eq!(tracker.state, DefenseState::Cooldown);

        assert!(tracker.can_defend(70));
        assert_eq!(tracker.state, DefenseState::Ready);
    }

    #[test]
    fn test_counter_window_closes_at_end_tick() {
        let mut tracker = DefenseTracker::default();
        tracker.open_counter_window(100, 30);
        assert!(tracker.has_counter_opportunity(129));
        assert!(!tracker.has_counter_opportunity(130));
        assert!(!tracker.has_counter_opportunity(120));
    }

    #[test]
    fn test_window_expiry_without_earlier_query() {
        let mut tracker = DefenseTracker::default();
        tracker.open_counter_window(0, 30);
        assert!(!tracker.has_counter_opportunity(500));
    }

    #[test]
    fn test_unknown_state_names_restore_as_ready() {
        assert_eq!(DefenseState::from_name("cooldown"), DefenseState::Cooldown);
        assert_eq!(DefenseState::from_name("DEFENDING"), DefenseState::Defending);
        assert_eq!(DefenseState::from_name("parrying"), DefenseState::Ready);
        assert_eq!(DefenseState::from_name(""), DefenseState::Ready);
    }
}
