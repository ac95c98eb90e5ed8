//! Aiming accrual
//!
//! A shooter holding aim (or pointing from the hip) accrues time, and time
//! earns an accuracy tier. The two postures have separate timers and only
//! one can run: starting either clears the other.

use serde::{Deserialize, Serialize};

use crate::combat::combatant::Combatant;
use crate::combat::constants::{STATE_AIMING, STATE_POINTED_FROM_HIP};
use crate::combat::modifiers::scale_ticks;
use crate::combat::state::CombatRecord;
use crate::core::error::{CombatError, Result};
use crate::core::types::{EntityId, Tick};
use crate::simulation::context::SimulationContext;

/// Deliberate aiming pace chosen by the character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AimingSpeed {
    Quick,
    #[default]
    Normal,
    Careful,
    VeryCareful,
}

impl AimingSpeed {
    /// Scale applied to the weapon's aiming duration
    pub fn timing_multiplier(&self) -> f64 {
        match self {
            AimingSpeed::Quick => 0.5,
            AimingSpeed::Normal => 1.0,
            AimingSpeed::Careful | AimingSpeed::VeryCareful => 2.0,
        }
    }

    pub fn accuracy_modifier(&self) -> i32 {
        match self {
            AimingSpeed::Quick => -20,
            AimingSpeed::Normal => 0,
            AimingSpeed::Careful => 15,
            AimingSpeed::VeryCareful => 25,
        }
    }

    /// Very careful aim adds a random stretch on top of the scaled duration
    pub fn adds_extra_time(&self) -> bool {
        matches!(self, AimingSpeed::VeryCareful)
    }

    pub fn faster(self) -> Self {
        match self {
            AimingSpeed::VeryCareful => AimingSpeed::Careful,
            AimingSpeed::Careful => AimingSpeed::Normal,
            AimingSpeed::Normal | AimingSpeed::Quick => AimingSpeed::Quick,
        }
    }

    pub fn slower(self) -> Self {
        match self {
            AimingSpeed::Quick => AimingSpeed::Normal,
            AimingSpeed::Normal => AimingSpeed::Careful,
            AimingSpeed::Careful | AimingSpeed::VeryCareful => AimingSpeed::VeryCareful,
        }
    }
}

/// Accuracy bonus earned by time spent aiming
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AimingBonusTier {
    #[default]
    None,
    Normal,
    Careful,
    VeryCareful,
}

impl AimingBonusTier {
    pub fn accuracy_modifier(&self) -> i32 {
        match self {
            AimingBonusTier::None | AimingBonusTier::Normal => 0,
            AimingBonusTier::Careful | AimingBonusTier::VeryCareful => 15,
        }
    }
}

/// Which posture timer is running, and since when
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AimTimer {
    #[default]
    Idle,
    Aiming { since: Tick },
    PointingFromHip { since: Tick },
}

impl AimTimer {
    pub fn start_aiming(&mut self, now: Tick) {
        *self = AimTimer::Aiming { since: now };
    }

    pub fn start_pointing(&mut self, now: Tick) {
        *self = AimTimer::PointingFromHip { since: now };
    }

    pub fn reset(&mut self) {
        *self = AimTimer::Idle;
    }

    /// Start whichever timer matches a freshly entered weapon state
    pub fn enter_posture(&mut self, state: &str, now: Tick) {
        match state {
            STATE_AIMING => self.start_aiming(now),
            STATE_POINTED_FROM_HIP => self.start_pointing(now),
            _ => {}
        }
    }

    pub fn aiming_duration(&self, now: Tick) -> Tick {
        match self {
            AimTimer::Aiming { since } => now.saturating_sub(*since),
            _ => 0,
        }
    }

    pub fn pointing_duration(&self, now: Tick) -> Tick {
        match self {
            AimTimer::PointingFromHip { since } => now.saturating_sub(*since),
            _ => 0,
        }
    }
}

/// Tier earned by `accumulated` ticks against a threshold of
/// `round(base_aiming_ticks × speed_multiplier)`
///
/// Point-from-hip tops out at NORMAL; VERY_CAREFUL needs `very_careful_allowed`.
pub fn bonus_tier(
    accumulated: Tick,
    base_aiming_ticks: Tick,
    speed_multiplier: f64,
    from_hip: bool,
    very_careful_allowed: bool,
) -> AimingBonusTier {
    let threshold = scale_ticks(base_aiming_ticks, speed_multiplier).max(1);

    if from_hip {
        return if accumulated >= threshold {
            AimingBonusTier::Normal
        } else {
            AimingBonusTier::None
        };
    }

    if accumulated >= threshold * 3 {
        if very_careful_allowed {
            AimingBonusTier::VeryCareful
        } else {
            AimingBonusTier::Careful
        }
    } else if accumulated >= threshold * 2 {
        AimingBonusTier::Careful
    } else if accumulated >= threshold {
        AimingBonusTier::Normal
    } else {
        AimingBonusTier::None
    }
}

/// Aiming pace for the next shot; follow-up shots of a sequence are snapped
pub fn aiming_speed_for_shot(combatant: &Combatant, record: &CombatRecord) -> AimingSpeed {
    if combatant.multiple_shot_count > 1 && record.attack.shots_in_sequence > 0 {
        AimingSpeed::Quick
    } else {
        combatant.aiming_speed
    }
}

/// Tier the combatant has earned right now
pub fn earned_bonus(ctx: &SimulationContext, id: EntityId) -> AimingBonusTier {
    let (Some(combatant), Some(record)) = (ctx.roster.get(id), ctx.states.get(id)) else {
        return AimingBonusTier::None;
    };
    let Some(weapon) = combatant.ranged_weapon.as_ref().filter(|_| !combatant.melee_mode) else {
        return AimingBonusTier::None;
    };

    let now = ctx.now();
    let from_hip = weapon.is_in(STATE_POINTED_FROM_HIP);
    let accumulated = if from_hip {
        record.aim.pointing_duration(now)
    } else if weapon.is_in(STATE_AIMING) {
        record.aim.aiming_duration(now)
    } else {
        return AimingBonusTier::None;
    };

    let base = weapon
        .graph()
        .get(STATE_AIMING)
        .map(|s| s.base_ticks)
        .unwrap_or(ctx.config.default_aiming_ticks);

    bonus_tier(
        accumulated,
        base,
        combatant.aiming_multiplier(),
        from_hip,
        combatant.can_use_very_careful_aim(),
    )
}

/// Aim faster (towards Quick)
pub fn increase_aiming_speed(ctx: &mut SimulationContext, id: EntityId) -> Result<AimingSpeed> {
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    combatant.aiming_speed = combatant.aiming_speed.faster();
    tracing::debug!(entity = %id, speed = ?combatant.aiming_speed, "aiming speed changed");
    Ok(combatant.aiming_speed)
}

/// Aim slower (towards VeryCareful, if the combatant qualifies)
pub fn decrease_aiming_speed(ctx: &mut SimulationContext, id: EntityId) -> Result<AimingSpeed> {
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let slower = combatant.aiming_speed.slower();
    if slower == AimingSpeed::VeryCareful && !combatant.can_use_very_careful_aim() {
        return Ok(combatant.aiming_speed);
    }
    combatant.aiming_speed = slower;
    tracing::debug!(entity = %id, speed = ?slower, "aiming speed changed");
    Ok(slower)
}

/// Flip between firing from aim and firing from the hip
///
/// A weapon already held in one posture switches to the other at once and the
/// posture timers follow. Returns the new preference (true = from aim).
pub fn toggle_firing_preference(ctx: &mut SimulationContext, id: EntityId) -> Result<bool> {
    let now = ctx.now();
    let combatant = ctx.roster.get_mut(id).ok_or(CombatError::EntityNotFound(id))?;
    let record = ctx.states.entry(id);
    record.hold.fires_from_aiming = !record.hold.fires_from_aiming;
    let from_aim = record.hold.fires_from_aiming;

    if let Some(weapon) = combatant.ranged_weapon.as_mut() {
        let swap_to = match weapon.state() {
            STATE_AIMING if !from_aim => Some(STATE_POINTED_FROM_HIP),
            STATE_POINTED_FROM_HIP if from_aim => Some(STATE_AIMING),
            _ => None,
        };
        if let Some(next) = swap_to.filter(|next| weapon.graph().contains(next)) {
            weapon.enter_state(next)?;
            record.aim.enter_posture(next, now);
        }
    }

    tracing::debug!(entity = %id, from_aim, "firing preference toggled");
    Ok(from_aim)
}
