//! Combat configuration with documented constants
//!
//! Every timing constant the controllers rely on is collected here, with the
//! value the engine has always used as its default. A context owns exactly
//! one configuration; there is no process-wide instance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{CombatError, Result};
use crate::core::types::Tick;

/// Configuration for the combat timing subsystems
///
/// Partial TOML files are accepted: any field left out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === DEFENSE ===
    /// Debug/testing toggle that turns every block attempt into a no-op
    pub defensive_blocking_disabled: bool,

    /// Ticks a defender spends in COOLDOWN after any resolved block attempt
    ///
    /// Started on success and failure alike, and again after a counter-attack.
    pub defense_cooldown_ticks: Tick,

    /// Length of the counter-attack window opened by a successful block
    pub counter_window_ticks: Tick,

    /// Minimum spacing between two defenses on the attack-driven path
    pub next_defense_interval_ticks: Tick,

    /// Flat chance that a block attempt succeeds
    ///
    /// Placeholder constant, not stat-driven. Kept literal pending review.
    pub block_success_chance: f64,

    /// Flat chance that a counter-attack lands
    pub counter_success_chance: f64,

    // === REACTION ===
    /// Base reaction delay before the reflex modifier is subtracted
    ///
    /// The delay is `max(1, base - reflexes modifier)`.
    pub reaction_base_delay_ticks: i64,

    /// How far a reaction is pushed back when the reactor is mid-attack
    pub reaction_defer_ticks: Tick,

    // === TARGETING ===
    /// Pause before picking a new target after the current one goes down
    pub retarget_delay_ticks: Tick,

    // === AIMING ===
    /// Aiming duration used when a weapon graph has no `aiming` state
    pub default_aiming_ticks: Tick,

    /// Ticks a shooter must already have spent in the preferred firing
    /// state before a shot takes the 1-tick fast path
    pub fast_path_min_dwell_ticks: Tick,

    /// Lower bound of the random extra time added by very careful aiming
    pub very_careful_extra_min_ticks: Tick,

    /// Upper bound (inclusive) of the random extra time for very careful aiming
    pub very_careful_extra_max_ticks: Tick,

    // === MELEE ===
    /// Interval between reach checks while a melee target is out of reach
    pub melee_range_recheck_ticks: Tick,

    // === WORLD ===
    /// World units per foot, used to report projectile distances
    pub units_per_foot: f32,

    /// Seed for the context's deterministic random number generator
    pub rng_seed: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            defensive_blocking_disabled: false,
            defense_cooldown_ticks: 60,
            counter_window_ticks: 30,
            next_defense_interval_ticks: 60,
            block_success_chance: 0.5,
            counter_success_chance: 0.7,
            reaction_base_delay_ticks: 30,
            reaction_defer_ticks: 30,
            retarget_delay_ticks: 60,
            default_aiming_ticks: 30,
            fast_path_min_dwell_ticks: 5,
            very_careful_extra_min_ticks: 120,
            very_careful_extra_max_ticks: 300,
            melee_range_recheck_ticks: 10,
            units_per_foot: 7.0,
            rng_seed: 42,
        }
    }
}

impl CombatConfig {
    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, chance) in [
            ("block_success_chance", self.block_success_chance),
            ("counter_success_chance", self.counter_success_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(format!("{} ({}) must be within 0.0..=1.0", name, chance));
            }
        }

        if self.very_careful_extra_min_ticks > self.very_careful_extra_max_ticks {
            return Err(format!(
                "very_careful_extra_min_ticks ({}) should be <= very_careful_extra_max_ticks ({})",
                self.very_careful_extra_min_ticks, self.very_careful_extra_max_ticks
            ));
        }

        if self.units_per_foot <= 0.0 {
            return Err("units_per_foot must be positive".into());
        }

        // Zero-length intervals would re-issue the same command every tick
        if self.reaction_defer_ticks == 0 || self.melee_range_recheck_ticks == 0 {
            return Err("Re-check and deferral intervals must be at least one tick".into());
        }

        Ok(())
    }

    /// Parse a (possibly partial) configuration from TOML and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(content)?;
        config.validate().map_err(CombatError::InvalidConfig)?;
        Ok(config)
    }

    /// Load a configuration file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CombatConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.defensive_blocking_disabled);
        assert_eq!(config.defense_cooldown_ticks, 60);
        assert_eq!(config.counter_window_ticks, 30);
    }

    #[test]
    fn test_invalid_chance_rejected() {
        let config = CombatConfig {
            block_success_chance: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_very_careful_range_rejected() {
        let config = CombatConfig {
            very_careful_extra_min_ticks: 400,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CombatConfig::from_toml_str(
            r#"
            defensive_blocking_disabled = true
            rng_seed = 7
            "#,
        )
        .expect("partial config should parse");

        assert!(config.defensive_blocking_disabled);
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.retarget_delay_ticks, 60);
    }

    #[test]
    fn test_toml_validation_errors_surface() {
        let result = CombatConfig::from_toml_str("counter_success_chance = -0.1");
        assert!(matches!(result, Err(CombatError::InvalidConfig(_))));
    }
}
