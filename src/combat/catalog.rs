//! Weapon catalog - read-only store of weapon definitions
//!
//! Definitions come from the built-in set or from TOML files. Lookups hand
//! out shared `Arc`s so every instance of a weapon type sees one graph.

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use serde::Deserialize;

use crate::combat::weapons::{
    FiringMode, MeleeReach, ReloadType, WeaponCategory, WeaponDefinition, WeaponInstance,
    WeaponStateDefinition, WeaponStateGraph,
};
use crate::core::error::{CombatError, Result};
use crate::core::types::Tick;

/// Catalog of all known weapon types
#[derive(Debug, Clone, Default)]
pub struct WeaponCatalog {
    weapons: AHashMap<String, Arc<WeaponDefinition>>,
}

impl WeaponCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in weapon set
    pub fn with_defaults() -> Self {
        let builtins = [
            ranged(
                "colt_peacemaker",
                "Colt Peacemaker",
                WeaponCategory::Pistol,
                pistol_graph(),
                RangedStats {
                    max_ammunition: 6,
                    firing_modes: vec![FiringMode::SingleShot],
                    burst_size: 1,
                    cyclic_rate_ticks: 0,
                    firing_delay_ticks: 0,
                    reload_ticks: 60,
                    reload_type: ReloadType::SingleRound,
                },
            ),
            ranged(
                "m1911",
                "M1911 Pistol",
                WeaponCategory::Pistol,
                pistol_graph(),
                RangedStats {
                    max_ammunition: 7,
                    firing_modes: vec![FiringMode::SingleShot],
                    burst_size: 1,
                    cyclic_rate_ticks: 0,
                    firing_delay_ticks: 0,
                    reload_ticks: 40,
                    reload_type: ReloadType::FullMagazine,
                },
            ),
            ranged(
                "winchester_1873",
                "Winchester 1873",
                WeaponCategory::Rifle,
                long_gun_graph(),
                RangedStats {
                    max_ammunition: 15,
                    firing_modes: vec![FiringMode::SingleShot],
                    burst_size: 1,
                    cyclic_rate_ticks: 0,
                    firing_delay_ticks: 20,
                    reload_ticks: 40,
                    reload_type: ReloadType::SingleRound,
                },
            ),
            ranged(
                "thompson",
                "Thompson SMG",
                WeaponCategory::SubmachineGun,
                long_gun_graph(),
                RangedStats {
                    max_ammunition: 20,
                    firing_modes: vec![FiringMode::Burst, FiringMode::FullAuto, FiringMode::SingleShot],
                    burst_size: 3,
                    cyclic_rate_ticks: 4,
                    firing_delay_ticks: 6,
                    reload_ticks: 50,
                    reload_type: ReloadType::FullMagazine,
                },
            ),
            melee("unarmed", "Unarmed", MeleeReach::Unarmed, 0, 120, 120, 0, 0.0),
            melee("bowie_knife", "Bowie Knife", MeleeReach::Short, 60, 90, 90, 4, 1.0),
            melee("cavalry_sabre", "Cavalry Sabre", MeleeReach::Medium, 90, 120, 120, 6, 3.0),
            melee("spear", "Spear", MeleeReach::Long, 120, 150, 150, 8, 6.0),
        ];

        let mut catalog = Self::new();
        for builtin in builtins {
            match builtin {
                Ok(definition) => catalog.add(definition),
                Err(e) => tracing::error!("skipping built-in weapon: {}", e),
            }
        }
        catalog
    }

    /// Add (or replace) a weapon definition
    pub fn add(&mut self, definition: WeaponDefinition) {
        self.weapons.insert(definition.id.clone(), Arc::new(definition));
    }

    pub fn get(&self, id: &str) -> Option<Arc<WeaponDefinition>> {
        self.weapons.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Weapon ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.weapons.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// A fresh, fully loaded instance of a catalogued weapon
    pub fn instantiate(&self, id: &str) -> Result<WeaponInstance> {
        self.get(id)
            .map(WeaponInstance::new)
            .ok_or_else(|| CombatError::UnknownWeapon(id.to_string()))
    }

    /// Merge every definition of `other` into this catalog
    pub fn extend(&mut self, other: WeaponCatalog) {
        self.weapons.extend(other.weapons);
    }

    /// Load weapons from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse weapons from TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let toml_data: TomlWeapons = toml::from_str(content)?;

        let mut catalog = Self::new();
        for weapon in toml_data.weapons {
            catalog.add(weapon.into_definition()?);
        }
        tracing::debug!(count = catalog.len(), "parsed weapon definitions");
        Ok(catalog)
    }
}

struct RangedStats {
    max_ammunition: u32,
    firing_modes: Vec<FiringMode>,
    burst_size: u32,
    cyclic_rate_ticks: Tick,
    firing_delay_ticks: Tick,
    reload_ticks: Tick,
    reload_type: ReloadType,
}

fn ranged(
    id: &str,
    name: &str,
    category: WeaponCategory,
    states: Result<WeaponStateGraph>,
    stats: RangedStats,
) -> Result<WeaponDefinition> {
    Ok(WeaponDefinition {
        id: id.into(),
        name: name.into(),
        category,
        states: Arc::new(states?),
        max_ammunition: stats.max_ammunition,
        firing_modes: stats.firing_modes,
        burst_size: stats.burst_size,
        cyclic_rate_ticks: stats.cyclic_rate_ticks,
        firing_delay_ticks: stats.firing_delay_ticks,
        reload_ticks: stats.reload_ticks,
        reload_type: stats.reload_type,
        defense_bonus: 0,
        attack_speed_ticks: 0,
        attack_cooldown_ticks: 0,
        reach_feet: 0.0,
    })
}

#[allow(clippy::too_many_arguments)]
fn melee(
    id: &str,
    name: &str,
    reach: MeleeReach,
    readying_ticks: Tick,
    attack_speed_ticks: Tick,
    attack_cooldown_ticks: Tick,
    defense_bonus: i32,
    reach_feet: f32,
) -> Result<WeaponDefinition> {
    Ok(WeaponDefinition {
        id: id.into(),
        name: name.into(),
        category: WeaponCategory::Melee(reach),
        states: Arc::new(melee_graph(readying_ticks)?),
        max_ammunition: 0,
        firing_modes: vec![FiringMode::SingleShot],
        burst_size: 1,
        cyclic_rate_ticks: 0,
        firing_delay_ticks: 0,
        reload_ticks: 0,
        reload_type: ReloadType::FullMagazine,
        defense_bonus,
        attack_speed_ticks,
        attack_cooldown_ticks,
        reach_feet,
    })
}

fn pistol_graph() -> Result<WeaponStateGraph> {
    WeaponStateGraph::new(
        "holstered",
        vec![
            WeaponStateDefinition::new("holstered", Some("drawing"), 15),
            WeaponStateDefinition::new("drawing", Some("ready"), 30),
            WeaponStateDefinition::new("ready", Some("pointedfromhip"), 15),
            WeaponStateDefinition::new("pointedfromhip", Some("aiming"), 15),
            WeaponStateDefinition::new("aiming", Some("firing"), 30),
            WeaponStateDefinition::new("firing", Some("recovering"), 5),
            WeaponStateDefinition::new("recovering", Some("aiming"), 30),
            WeaponStateDefinition::new("reloading", Some("ready"), 0),
        ],
    )
}

fn long_gun_graph() -> Result<WeaponStateGraph> {
    WeaponStateGraph::new(
        "slung",
        vec![
            WeaponStateDefinition::new("slung", Some("unsling"), 15),
            WeaponStateDefinition::new("unsling", Some("ready"), 45),
            WeaponStateDefinition::new("ready", Some("pointedfromhip"), 20),
            WeaponStateDefinition::new("pointedfromhip", Some("aiming"), 20),
            WeaponStateDefinition::new("aiming", Some("firing"), 45),
            WeaponStateDefinition::new("firing", Some("recovering"), 5),
            WeaponStateDefinition::new("recovering", Some("aiming"), 40),
            WeaponStateDefinition::new("reloading", Some("ready"), 0),
        ],
    )
}

fn melee_graph(readying_ticks: Tick) -> Result<WeaponStateGraph> {
    if readying_ticks == 0 {
        return WeaponStateGraph::new(
            "melee_ready",
            vec![
                WeaponStateDefinition::new("melee_ready", Some("melee_attacking"), 0),
                WeaponStateDefinition::new("melee_attacking", Some("melee_ready"), 0),
            ],
        );
    }
    WeaponStateGraph::new(
        "sheathed",
        vec![
            WeaponStateDefinition::new("sheathed", Some("unsheathing"), 0),
            WeaponStateDefinition::new("unsheathing", Some("melee_ready"), readying_ticks),
            WeaponStateDefinition::new("melee_ready", Some("melee_attacking"), 0),
            WeaponStateDefinition::new("melee_attacking", Some("melee_ready"), 0),
        ],
    )
}

// TOML parsing structures

#[derive(Deserialize)]
struct TomlWeapons {
    #[serde(default)]
    weapons: Vec<TomlWeapon>,
}

#[derive(Deserialize)]
struct TomlWeapon {
    id: String,
    name: String,
    category: String,
    #[serde(default)]
    melee_reach: Option<MeleeReach>,
    initial_state: String,
    #[serde(default)]
    max_ammunition: u32,
    #[serde(default)]
    firing_modes: Vec<FiringMode>,
    #[serde(default = "default_burst_size")]
    burst_size: u32,
    #[serde(default)]
    cyclic_rate_ticks: Tick,
    #[serde(default)]
    firing_delay_ticks: Tick,
    #[serde(default)]
    reload_ticks: Tick,
    #[serde(default = "default_reload_type")]
    reload_type: ReloadType,
    #[serde(default)]
    defense_bonus: i32,
    #[serde(default)]
    attack_speed_ticks: Tick,
    #[serde(default)]
    attack_cooldown_ticks: Tick,
    #[serde(default)]
    reach_feet: f32,
    states: Vec<TomlState>,
}

#[derive(Deserialize)]
struct TomlState {
    name: String,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    ticks: Tick,
}

fn default_burst_size() -> u32 {
    1
}

fn default_reload_type() -> ReloadType {
    ReloadType::FullMagazine
}

impl TomlWeapon {
    fn into_definition(self) -> Result<WeaponDefinition> {
        let category = match self.category.to_lowercase().as_str() {
            "pistol" => WeaponCategory::Pistol,
            "rifle" => WeaponCategory::Rifle,
            "submachine_gun" | "submachinegun" | "smg" => WeaponCategory::SubmachineGun,
            "other" => WeaponCategory::Other,
            "melee" => WeaponCategory::Melee(self.melee_reach.ok_or_else(|| {
                CombatError::InvalidDefinition(format!("melee weapon '{}' needs melee_reach", self.id))
            })?),
            other => {
                return Err(CombatError::InvalidDefinition(format!(
                    "weapon '{}' has unknown category '{}'",
                    self.id, other
                )))
            }
        };

        if self.burst_size == 0 {
            return Err(CombatError::InvalidDefinition(format!(
                "weapon '{}' has a burst size of zero",
                self.id
            )));
        }

        let states = self
            .states
            .into_iter()
            .map(|s| WeaponStateDefinition {
                name: s.name,
                successor: s.next,
                base_ticks: s.ticks,
            })
            .collect();
        let graph = WeaponStateGraph::new(&self.initial_state, states)?;

        let firing_modes = if self.firing_modes.is_empty() {
            vec![FiringMode::SingleShot]
        } else {
            self.firing_modes
        };

        Ok(WeaponDefinition {
            id: self.id,
            name: self.name,
            category,
            states: Arc::new(graph),
            max_ammunition: self.max_ammunition,
            firing_modes,
            burst_size: self.burst_size,
            cyclic_rate_ticks: self.cyclic_rate_ticks,
            firing_delay_ticks: self.firing_delay_ticks,
            reload_ticks: self.reload_ticks,
            reload_type: self.reload_type,
            defense_bonus: self.defense_bonus,
            attack_speed_ticks: self.attack_speed_ticks,
            attack_cooldown_ticks: self.attack_cooldown_ticks,
            reach_feet: self.reach_feet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_defaults() {
        let catalog = WeaponCatalog::with_defaults();
        assert!(catalog.get("colt_peacemaker").is_some());
        assert!(catalog.get("thompson").is_some());
        assert!(catalog.get("cavalry_sabre").is_some());
        assert_eq!(catalog.len(), 8);
    }

    #[test]
    fn test_catalog_get_nonexistent() {
        let catalog = WeaponCatalog::with_defaults();
        assert!(catalog.get("laser_rifle").is_none());
        assert!(matches!(
            catalog.instantiate("laser_rifle"),
            Err(CombatError::UnknownWeapon(_))
        ));
    }

    #[test]
    fn test_instances_share_one_graph() {
        let catalog = WeaponCatalog::with_defaults();
        let a = catalog.instantiate("m1911").expect("known weapon");
        let b = catalog.instantiate("m1911").expect("known weapon");
        assert!(std::ptr::eq(a.graph(), b.graph()));
    }

    #[test]
    fn test_unarmed_starts_ready() {
        let catalog = WeaponCatalog::with_defaults();
        let fists = catalog.instantiate("unarmed").expect("known weapon");
        assert_eq!(fists.state(), "melee_ready");
    }

    #[test]
    fn test_weapon_toml_parsing() {
        let toml_content = r#"
            [[weapons]]
            id = "derringer"
            name = "Derringer"
            category = "Pistol"
            initial_state = "pocketed"
            max_ammunition = 2
            reload_ticks = 30
            reload_type = "single_round"

            [[weapons.states]]
            name = "pocketed"
            next = "ready"
            ticks = 20

            [[weapons.states]]
            name = "ready"
            next = "aiming"
            ticks = 10

            [[weapons.states]]
            name = "aiming"
            next = "firing"
            ticks = 15
        "#;

        let catalog = WeaponCatalog::parse_toml(toml_content).expect("Failed to parse TOML");
        let derringer = catalog.get("derringer").expect("derringer loaded");
        assert_eq!(derringer.category, WeaponCategory::Pistol);
        assert_eq!(derringer.max_ammunition, 2);
        assert_eq!(derringer.reload_type, ReloadType::SingleRound);
        assert_eq!(derringer.firing_modes, vec![FiringMode::SingleShot]);
        assert_eq!(derringer.states.initial().name, "pocketed");
    }

    #[test]
    fn test_weapon_toml_melee_needs_reach() {
        let toml_content = r#"
            [[weapons]]
            id = "club"
            name = "Club"
            category = "melee"
            initial_state = "melee_ready"

            [[weapons.states]]
            name = "melee_ready"
        "#;

        let result = WeaponCatalog::parse_toml(toml_content);
        assert!(matches!(result, Err(CombatError::InvalidDefinition(_))));
    }

    #[test]
    fn test_weapon_toml_unknown_category() {
        let toml_content = r#"
            [[weapons]]
            id = "phaser"
            name = "Phaser"
            category = "energy"
            initial_state = "ready"

            [[weapons.states]]
            name = "ready"
        "#;

        match WeaponCatalog::parse_toml(toml_content) {
            Err(CombatError::InvalidDefinition(msg)) => assert!(msg.contains("energy")),
            other => panic!("expected invalid definition, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_weapon_toml_bad_initial_state() {
        let toml_content = r#"
            [[weapons]]
            id = "broken"
            name = "Broken"
            category = "other"
            initial_state = "missing"

            [[weapons.states]]
            name = "ready"
        "#;

        assert!(WeaponCatalog::parse_toml(toml_content).is_err());
    }
}
