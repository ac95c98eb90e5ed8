//! Reference timing scenarios for the combat engine
//!
//! Each test builds a fresh context with hand-made weapon graphs so the
//! expected tick numbers follow directly from the state durations.

use std::sync::Arc;

use fireline::combat::{
    defense, reaction, reload, transition, Attributes, Combatant, EffectLog, FiringMode,
    ReloadType, WeaponCategory, WeaponDefinition, WeaponInstance, WeaponStateDefinition,
    WeaponStateGraph,
};
use fireline::core::{CombatConfig, EntityId, FactionId, Tick, Vec2};
use fireline::simulation::Command;
use fireline::SimulationContext;

fn state(name: &str, next: Option<&str>, ticks: Tick) -> WeaponStateDefinition {
    WeaponStateDefinition::new(name, next, ticks)
}

/// ready → firing → recovering → aiming, with a reloading state
fn drill_weapon(ready_ticks: Tick, ammo: u32, modes: Vec<FiringMode>) -> WeaponDefinition {
    let graph = WeaponStateGraph::new(
        "ready",
        vec![
            state("ready", Some("firing"), ready_ticks),
            state("aiming", Some("firing"), 30),
            state("firing", Some("recovering"), 5),
            state("recovering", Some("aiming"), 10),
            state("reloading", Some("ready"), 0),
        ],
    )
    .expect("valid drill graph");

    WeaponDefinition {
        id: "drill".into(),
        name: "Drill Pistol".into(),
        category: WeaponCategory::Pistol,
        states: Arc::new(graph),
        max_ammunition: ammo,
        firing_modes: modes,
        burst_size: 3,
        cyclic_rate_ticks: 10,
        firing_delay_ticks: 0,
        reload_ticks: 20,
        reload_type: ReloadType::SingleRound,
        defense_bonus: 0,
        attack_speed_ticks: 0,
        attack_cooldown_ticks: 0,
        reach_feet: 0.0,
    }
}

/// ready → aiming → firing → recovering → aiming
fn watched_weapon(ready_ticks: Tick) -> WeaponDefinition {
    let graph = WeaponStateGraph::new(
        "ready",
        vec![
            state("ready", Some("aiming"), ready_ticks),
            state("aiming", Some("firing"), 30),
            state("firing", Some("recovering"), 5),
            state("recovering", Some("aiming"), 10),
        ],
    )
    .expect("valid graph");
    WeaponDefinition {
        id: "watched".into(),
        states: Arc::new(graph),
        ..drill_weapon(ready_ticks, 6, vec![FiringMode::SingleShot])
    }
}

fn soldier(id: u32, faction: u32, reflexes: i32, weapon: WeaponDefinition) -> Combatant {
    Combatant::new(EntityId(id), format!("soldier-{}", id), FactionId(faction))
        .with_position(Vec2::new(id as f32 * 10.0, 0.0))
        .with_attributes(Attributes {
            dexterity: 50,
            reflexes,
        })
        .with_ranged_weapon(WeaponInstance::new(Arc::new(weapon)))
}

fn pending_fire_ticks(ctx: &SimulationContext, id: EntityId) -> Vec<Tick> {
    ctx.scheduler
        .pending_for(id)
        .into_iter()
        .filter(|a| matches!(a.command, Command::Fire { .. }))
        .map(|a| a.due)
        .collect()
}

#[test]
fn test_scenario_fire_from_ready_after_ready_duration() {
    let mut ctx = SimulationContext::new(CombatConfig::default());
    let shooter = ctx.add_combatant(soldier(1, 0, 50, drill_weapon(30, 6, vec![FiringMode::SingleShot])));
    let target = ctx.add_combatant(soldier(2, 1, 50, drill_weapon(30, 6, vec![FiringMode::SingleShot])));
    ctx.run_until(12);

    let started = transition::start_attack_sequence(&mut ctx, shooter, Some(target)).expect("attack starts");
    assert!(started);
    assert_eq!(pending_fire_ticks(&ctx, shooter), vec![42]);
}

#[test]
fn test_scenario_burst_of_three() {
    let log = EffectLog::new();
    let mut ctx = SimulationContext::new(CombatConfig::default()).with_effects(log.clone());
    let shooter = ctx.add_combatant(soldier(1, 0, 50, drill_weapon(30, 3, vec![FiringMode::Burst])));
    let target = ctx.add_combatant(soldier(2, 1, 50, drill_weapon(30, 3, vec![FiringMode::SingleShot])));

    transition::start_attack_sequence(&mut ctx, shooter, Some(target)).expect("attack starts");
    ctx.run_until(30);

    let record = ctx.record(shooter).expect("record");
    assert!(record.burst.automatic_firing);
    assert_eq!(record.burst.shots_fired, 1);

    ctx.run_until(50);
    let shots = log.shots_by(shooter);
    let ticks: Vec<Tick> = shots.iter().map(|s| s.fire_tick).collect();
    assert_eq!(ticks, vec![30, 40, 50]);
    assert_eq!(shots.iter().map(|s| s.burst_shot).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(
        shots.iter().map(|s| s.burst_penalty).collect::<Vec<_>>(),
        vec![false, true, true]
    );

    let weapon = ctx.combatant(shooter).and_then(|c| c.ranged_weapon.as_ref()).expect("weapon");
    assert_eq!(weapon.ammunition(), 0);
    let record = ctx.record(shooter).expect("record");
    assert!(!record.burst.automatic_firing);
    assert_eq!(record.burst.shots_fired, 0);

    ctx.run_until(200);
    assert!(log.shots_by(shooter).len() <= 3);
}

#[test]
fn test_scenario_persistent_bursts_resume_after_the_burst() {
    let log = EffectLog::new();
    let mut ctx = SimulationContext::new(CombatConfig::default()).with_effects(log.clone());
    let mut shooter = soldier(1, 0, 50, drill_weapon(30, 9, vec![FiringMode::Burst]));
    shooter.persistent_attack = true;
    let shooter = ctx.add_combatant(shooter);
    let target = ctx.add_combatant(soldier(2, 1, 50, drill_weapon(30, 3, vec![FiringMode::SingleShot])));

    transition::start_attack_sequence(&mut ctx, shooter, Some(target)).expect("attack starts");

    // recovery ends at 45 with round three still to come; the next burst is
    // paced from round two: 40 + 2 x 10 + 0
    ctx.run_until(45);
    let resumes: Vec<Tick> = ctx
        .scheduler
        .pending_for(shooter)
        .into_iter()
        .filter(|a| matches!(a.command, Command::ResumeAfterBurst))
        .map(|a| a.due)
        .collect();
    assert_eq!(resumes, vec![60]);
    assert!(ctx.record(shooter).is_some_and(|r| !r.attack.is_attacking && r.burst.automatic_firing));

    ctx.run_until(115);
    let ticks: Vec<Tick> = log.shots_by(shooter).iter().map(|s| s.fire_tick).collect();
    assert_eq!(ticks, vec![30, 40, 50, 61, 71, 81, 92, 102, 112]);
    assert_eq!(
        log.shots_by(shooter).iter().map(|s| s.burst_shot).collect::<Vec<_>>(),
        vec![1, 2, 3, 1, 2, 3, 1, 2, 3]
    );
    assert!(reload::is_reloading(&ctx, shooter));
}

#[test]
fn test_scenario_single_round_reload_with_fast_reflexes() {
    let mut ctx = SimulationContext::new(CombatConfig::default());
    let id = ctx.add_combatant(soldier(1, 0, 85, drill_weapon(30, 3, vec![FiringMode::SingleShot])));
    if let Some(weapon) = ctx.combatant_mut(id).and_then(|c| c.ranged_weapon.as_mut()) {
        weapon.set_ammunition(0);
    }

    assert!(reload::start_reload(&mut ctx, id).expect("reload starts"));
    assert_eq!(ctx.record(id).and_then(|r| r.reload).map(|r| r.completes_at), Some(18));

    let ammo = |ctx: &SimulationContext| {
        ctx.combatant(id)
            .and_then(|c| c.ranged_weapon.as_ref())
            .map(|w| w.ammunition())
    };

    ctx.run_until(17);
    assert_eq!(ammo(&ctx), Some(0));
    ctx.run_until(18);
    assert_eq!(ammo(&ctx), Some(1));
    ctx.run_until(35);
    assert_eq!(ammo(&ctx), Some(1));
    ctx.run_until(36);
    assert_eq!(ammo(&ctx), Some(2));
    ctx.run_until(54);
    assert_eq!(ammo(&ctx), Some(3));

    assert!(!reload::is_reloading(&ctx, id));
    let weapon = ctx.combatant(id).and_then(|c| c.ranged_weapon.as_ref()).expect("weapon");
    assert_eq!(weapon.state(), "ready");
    assert_eq!(ctx.combatant(id).map(|c| c.statistics.reloads_completed), Some(1));
}

#[test]
fn test_scenario_defense_not_ready_before_next_defense_tick() {
    let mut ctx = SimulationContext::new(CombatConfig::default());
    let id = ctx.add_combatant(soldier(1, 0, 50, drill_weapon(30, 6, vec![FiringMode::SingleShot])));
    ctx.states.entry(id).defense.next_defense_tick = 100;
    ctx.run_until(90);

    assert!(!defense::can_defend_against_attack(&ctx, id));
    assert_eq!(defense::perform_defense(&mut ctx, id).expect("defense"), 0);

    let record = ctx.record(id).expect("record");
    assert_eq!(record.defense.cooldown_end, 0);
    assert_eq!(record.defense.next_defense_tick, 100);
    assert_eq!(ctx.combatant(id).map(|c| c.statistics.defensive_attempts), Some(0));
}

#[test]
fn test_scenario_reaction_to_target_raising_weapon() {
    let mut ctx = SimulationContext::new(CombatConfig::default());
    let watcher = ctx.add_combatant(soldier(1, 0, 75, drill_weapon(30, 6, vec![FiringMode::SingleShot])));
    let watched = ctx.add_combatant(soldier(2, 1, 50, watched_weapon(50)));

    reaction::set_reaction_target(&mut ctx, watcher, watched).expect("watch set");
    transition::start_attack_sequence(&mut ctx, watched, Some(watcher)).expect("attack starts");

    ctx.run_until(49);
    assert!(ctx.record(watcher).and_then(|r| r.reaction.as_ref()).is_some_and(|w| w.trigger_tick.is_none()));

    ctx.run_until(50);
    let weapon = ctx.combatant(watched).and_then(|c| c.ranged_weapon.as_ref()).expect("weapon");
    assert_eq!(weapon.state(), "aiming");
    let trigger = ctx.record(watcher).and_then(|r| r.reaction.as_ref()).and_then(|w| w.trigger_tick);
    assert_eq!(trigger, Some(75));
    assert!(ctx
        .scheduler
        .pending_for(watcher)
        .iter()
        .any(|a| a.due == 75 && a.command == Command::ReactionTrigger));

    ctx.run_until(75);
    let record = ctx.record(watcher).expect("record");
    assert!(record.reaction.is_none());
    assert!(record.attack.is_attacking);
    assert_eq!(record.targets.current, Some(watched));
}
