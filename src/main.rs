//! Fireline skirmish runner
//!
//! Two squads trade fire under the combat timing engine until one side is
//! down or the tick budget runs out. Hits are rolled here with a flat chance
//! per projectile adjusted by the earned aiming tier; wound resolution proper
//! lives outside the engine.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fireline::combat::{
    transition, Attributes, CombatStatistics, Combatant, EffectEvent, EffectLog, SkillKind,
    SkillSet, WeaponCatalog,
};
use fireline::core::{CombatConfig, EntityId, FactionId, Result, Tick, Vec2};
use fireline::SimulationContext;

/// Fireline - tactical combat timing skirmish
#[derive(Parser, Debug)]
#[command(name = "fireline")]
#[command(about = "Run a two-squad skirmish through the combat timing engine")]
struct Args {
    /// Maximum ticks to simulate
    #[arg(long, default_value_t = 1500)]
    ticks: u64,

    /// Random seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Combat configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra weapon definitions TOML, merged over the built-in set
    #[arg(long)]
    weapons: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Base chance that a projectile puts its target down
    #[arg(long, default_value_t = 0.2)]
    hit_chance: f64,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

struct Recruit {
    name: &'static str,
    weapon: &'static str,
    reflexes: i32,
    dexterity: i32,
    skill: SkillKind,
    skill_level: u8,
}

const SQUADS: [[Recruit; 3]; 2] = [
    [
        Recruit { name: "Abe", weapon: "colt_peacemaker", reflexes: 70, dexterity: 60, skill: SkillKind::Pistol, skill_level: 3 },
        Recruit { name: "Beth", weapon: "winchester_1873", reflexes: 55, dexterity: 65, skill: SkillKind::Rifle, skill_level: 4 },
        Recruit { name: "Cyrus", weapon: "thompson", reflexes: 50, dexterity: 45, skill: SkillKind::SubmachineGun, skill_level: 2 },
    ],
    [
        Recruit { name: "Dora", weapon: "m1911", reflexes: 85, dexterity: 50, skill: SkillKind::Pistol, skill_level: 2 },
        Recruit { name: "Eli", weapon: "winchester_1873", reflexes: 40, dexterity: 70, skill: SkillKind::Rifle, skill_level: 5 },
        Recruit { name: "Fay", weapon: "thompson", reflexes: 60, dexterity: 55, skill: SkillKind::SubmachineGun, skill_level: 1 },
    ],
];

#[derive(Serialize)]
struct CombatantSummary {
    id: EntityId,
    name: String,
    faction: u32,
    weapon: String,
    ammunition: u32,
    incapacitated: bool,
    statistics: CombatStatistics,
}

#[derive(Serialize)]
struct SkirmishReport {
    seed: u64,
    ticks: Tick,
    combatants: Vec<CombatantSummary>,
    events: Vec<EffectEvent>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "fireline=debug" } else { "fireline=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => CombatConfig::load(path)?,
        None => CombatConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    let seed = config.rng_seed;

    let mut catalog = WeaponCatalog::with_defaults();
    if let Some(path) = &args.weapons {
        catalog.extend(WeaponCatalog::load_from_toml(path)?);
    }
    tracing::info!(seed, weapons = catalog.len(), "skirmish starting");

    let log = EffectLog::new();
    let mut ctx = SimulationContext::try_new(config)?.with_effects(log.clone());
    let ids = deploy_squads(&mut ctx, &catalog)?;
    for id in &ids {
        transition::start_attack_sequence(&mut ctx, *id, None)?;
    }

    let mut hit_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut resolved = 0;
    for _ in 0..args.ticks {
        ctx.step();

        let shots = log.projectile_shots();
        for shot in &shots[resolved..] {
            let mut chance = args.hit_chance + f64::from(shot.aiming_bonus.accuracy_modifier()) / 100.0;
            if shot.burst_penalty {
                chance -= 0.1;
            }
            if ctx.roster.is_active(shot.target) && hit_rng.gen::<f64>() < chance.clamp(0.0, 1.0) {
                ctx.set_incapacitated(shot.target, true)?;
            }
        }
        resolved = shots.len();

        if squad_down(&ctx, FactionId(0)) || squad_down(&ctx, FactionId(1)) {
            tracing::info!(tick = ctx.now(), "one side is down");
            break;
        }
    }

    let report = SkirmishReport {
        seed,
        ticks: ctx.now(),
        combatants: summarize(&ctx),
        events: log.events(),
    };
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn deploy_squads(ctx: &mut SimulationContext, catalog: &WeaponCatalog) -> Result<Vec<EntityId>> {
    let mut ids = Vec::new();
    for (side, squad) in SQUADS.iter().enumerate() {
        let x = if side == 0 { 0.0 } else { 280.0 };
        for (slot, recruit) in squad.iter().enumerate() {
            let id = EntityId(ids.len() as u32 + 1);
            let mut combatant = Combatant::new(id, recruit.name, FactionId(side as u32))
                .with_position(Vec2::new(x, slot as f32 * 21.0))
                .with_attributes(Attributes {
                    dexterity: recruit.dexterity,
                    reflexes: recruit.reflexes,
                })
                .with_skills(
                    SkillSet::new()
                        .with(recruit.skill, recruit.skill_level)
                        .with(SkillKind::Quickdraw, 1),
                )
                .with_ranged_weapon(catalog.instantiate(recruit.weapon)?);
            combatant.persistent_attack = true;
            combatant.automatic_targeting = true;
            ids.push(ctx.add_combatant(combatant));
        }
    }
    Ok(ids)
}

fn squad_down(ctx: &SimulationContext, faction: FactionId) -> bool {
    ctx.roster
        .iter()
        .filter(|c| c.faction == faction)
        .all(|c| c.incapacitated)
}

fn summarize(ctx: &SimulationContext) -> Vec<CombatantSummary> {
    ctx.roster
        .ids()
        .into_iter()
        .filter_map(|id| ctx.roster.get(id))
        .map(|c| CombatantSummary {
            id: c.id,
            name: c.name.clone(),
            faction: c.faction.0,
            weapon: c
                .ranged_weapon
                .as_ref()
                .map_or_else(String::new, |w| w.definition().name.clone()),
            ammunition: c.ranged_weapon.as_ref().map_or(0, |w| w.ammunition()),
            incapacitated: c.incapacitated,
            statistics: c.statistics,
        })
        .collect()
}

fn print_text(report: &SkirmishReport) {
    println!("\n=== FIRELINE SKIRMISH (seed {}) ===", report.seed);
    println!("Ended at tick {}\n", report.ticks);
    println!(
        "{:<4} {:<8} {:<4} {:<18} {:>5} {:>6} {:>7} {:>8}  status",
        "id", "name", "side", "weapon", "ammo", "shots", "reloads", "targets"
    );
    for c in &report.combatants {
        println!(
            "{:<4} {:<8} {:<4} {:<18} {:>5} {:>6} {:>7} {:>8}  {}",
            c.id.to_string(),
            c.name,
            c.faction,
            c.weapon,
            c.ammunition,
            c.statistics.shots_fired,
            c.statistics.reloads_completed,
            c.statistics.targets_engaged,
            if c.incapacitated { "down" } else { "standing" }
        );
    }
    println!("\n{} effect events recorded", report.events.len());
}
