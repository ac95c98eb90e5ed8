//! Stat modifiers and attribute-derived speed factors

use crate::combat::constants::{
    AIMING_BONUS_SHARE, AIMING_QUICKDRAW_SLOPE, AIMING_REFLEX_SLOPE, QUICKDRAW_SLOPE,
    RELOAD_REFLEX_SLOPE, WEAPON_READY_REFLEX_SLOPE,
};
use crate::core::types::Tick;

/// Modifier for stats 1..=50; the upper half mirrors it with the sign flipped
const LOWER_HALF: [i32; 51] = [
    0, // unused, stats start at 1
    -20, -19, -18, -17, -16, -15, -14, -14, -13, -13, //
    -12, -12, -11, -11, -10, -10, -9, -9, -8, -8, //
    -7, -7, -6, -6, -5, -5, -5, -4, -4, -4, //
    -3, -3, -3, -3, -2, -2, -2, -2, -2, -1, //
    -1, -1, -1, -1, -1, 0, 0, 0, 0, 0,
];

/// Convert a 1..=100 attribute into its signed modifier (-20..=+20)
///
/// Out-of-range inputs are clamped before lookup.
pub fn stat_to_modifier(stat: i32) -> i32 {
    let stat = stat.clamp(1, 100);
    match stat {
        1..=50 => LOWER_HALF[stat as usize],
        51 => 0,
        _ => -LOWER_HALF[(101 - stat) as usize],
    }
}

/// Multiplier applied to preparation-state durations
pub fn weapon_ready_speed_multiplier(reflexes_modifier: i32, quickdraw_level: u8) -> f64 {
    let reflex_factor = 1.0 - reflexes_modifier as f64 * WEAPON_READY_REFLEX_SLOPE;
    let quickdraw_factor = 1.0 - quickdraw_level as f64 * QUICKDRAW_SLOPE;
    reflex_factor * quickdraw_factor
}

/// Multiplier applied to reload durations
pub fn reload_speed_multiplier(reflexes_modifier: i32) -> f64 {
    1.0 - reflexes_modifier as f64 * RELOAD_REFLEX_SLOPE
}

/// Readiness factor that aiming draws on, on gentler slopes than readying
pub fn aiming_ready_multiplier(reflexes_modifier: i32, quickdraw_level: u8) -> f64 {
    let reflex_factor = 1.0 - reflexes_modifier as f64 * AIMING_REFLEX_SLOPE;
    let quickdraw_factor = 1.0 - quickdraw_level as f64 * AIMING_QUICKDRAW_SLOPE;
    reflex_factor * quickdraw_factor
}

/// Aiming keeps a quarter of whatever the aiming-ready multiplier gains or loses
pub fn aiming_speed_multiplier(aiming_ready_multiplier: f64) -> f64 {
    1.0 - (1.0 - aiming_ready_multiplier) * AIMING_BONUS_SHARE
}

/// Scale a base duration, rounding to the nearest tick and never going negative
pub fn scale_ticks(base: Tick, multiplier: f64) -> Tick {
    let scaled = (base as f64 * multiplier).round();
    if scaled <= 0.0 {
        0
    } else {
        scaled as Tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_table_endpoints() {
        assert_eq!(stat_to_modifier(1), -20);
        assert_eq!(stat_to_modifier(50), 0);
        assert_eq!(stat_to_modifier(51), 0);
        assert_eq!(stat_to_modifier(100), 20);
    }

    #[test]
    fn test_modifier_table_is_symmetric() {
        for stat in 1..=49 {
            assert_eq!(stat_to_modifier(101 - stat), -stat_to_modifier(stat), "stat {}", stat);
        }
    }

    #[test]
    fn test_modifier_clamps_out_of_range() {
        assert_eq!(stat_to_modifier(-40), -20);
        assert_eq!(stat_to_modifier(0), -20);
        assert_eq!(stat_to_modifier(250), 20);
    }

    #[test]
    fn test_reference_stats() {
        assert_eq!(stat_to_modifier(85), 10);
        assert_eq!(stat_to_modifier(75), 5);
        assert_eq!(stat_to_modifier(15), -10);
    }

    #[test]
    fn test_neutral_multipliers() {
        assert!((weapon_ready_speed_multiplier(0, 0) - 1.0).abs() < 1e-9);
        assert!((reload_speed_multiplier(0) - 1.0).abs() < 1e-9);
        assert!((aiming_speed_multiplier(1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reload_multiplier_for_good_reflexes() {
        assert!((reload_speed_multiplier(10) - 0.9).abs() < 1e-9);
        assert_eq!(scale_ticks(20, reload_speed_multiplier(10)), 18);
    }

    #[test]
    fn test_quickdraw_speeds_up_readying() {
        let plain = weapon_ready_speed_multiplier(0, 0);
        let skilled = weapon_ready_speed_multiplier(0, 2);
        assert!(skilled < plain);
        assert!((skilled - 0.84).abs() < 1e-9);
    }

    #[test]
    fn test_aiming_ready_slopes_are_gentler() {
        assert!((aiming_ready_multiplier(20, 0) - 0.8).abs() < 1e-9);
        assert!((aiming_ready_multiplier(0, 4) - 0.8).abs() < 1e-9);
        assert!(aiming_ready_multiplier(20, 0) > weapon_ready_speed_multiplier(20, 0));
    }

    #[test]
    fn test_aiming_keeps_quarter_of_bonus() {
        // aiming ready 0.8 => aiming 0.95
        assert!((aiming_speed_multiplier(0.8) - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_scale_ticks_rounds_and_floors_at_zero() {
        assert_eq!(scale_ticks(30, 1.0), 30);
        assert_eq!(scale_ticks(15, 0.5), 8);
        assert_eq!(scale_ticks(10, -1.0), 0);
    }
}
